mod account;
mod note;
mod object;

pub(crate) use account::Account;
pub(crate) use note::Note;
pub(crate) use object::Object;
