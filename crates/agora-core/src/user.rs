//! User: the author or editor of a topic.
//!
//! Users are owned by the account system; this crate only needs their
//! identity and whether they carry administrative rights.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  #[default]
  Member,
  Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:    Uuid,
  pub username:   String,
  pub role:       Role,
  pub created_at: DateTime<Utc>,
}

impl User {
  pub fn is_admin(&self) -> bool { self.role == Role::Admin }

  /// Whether this user may edit a topic written by `author_id`.
  pub fn can_edit(&self, author_id: Uuid) -> bool {
    self.user_id == author_id || self.is_admin()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn user(role: Role) -> User {
    User {
      user_id: Uuid::new_v4(),
      username: "ada".into(),
      role,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn author_can_edit_own_topic() {
    let u = user(Role::Member);
    assert!(u.can_edit(u.user_id));
    assert!(!u.can_edit(Uuid::new_v4()));
  }

  #[test]
  fn admin_can_edit_anything() {
    let u = user(Role::Admin);
    assert!(u.is_admin());
    assert!(u.can_edit(Uuid::new_v4()));
  }
}
