use serde::{Deserialize, Serialize};

use crate::graph::types::WirePerson;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Contacts outside the directory come back without one.
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub user_principal_name: Option<String>,
}

impl Person {
    /// Same person for picker purposes: by id, or by display name when
    /// `self` has no id. Two id-less contacts with the same name collide.
    pub fn is_same_as(&self, other: &Person) -> bool {
        match (&self.id, &other.id) {
            (Some(a), Some(b)) => a == b,
            (None, _) => self.display_name.is_some() && self.display_name == other.display_name,
            (Some(_), None) => false,
        }
    }

    pub fn is_in(&self, people: &[Person]) -> bool {
        people.iter().any(|p| self.is_same_as(p))
    }
}

impl From<WirePerson> for Person {
    fn from(person: WirePerson) -> Self {
        Self {
            id: person.id,
            display_name: person.display_name,
            email: person.scored_email_addresses.into_iter().find_map(|e| e.address),
            user_principal_name: person.user_principal_name,
        }
    }
}
