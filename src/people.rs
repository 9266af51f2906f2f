mod person;
mod search;

pub use person::Person;
pub use search::{PeopleSearch, PickerView, SearchSettings};
