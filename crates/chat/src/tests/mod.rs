mod conversation;
mod fakes;
