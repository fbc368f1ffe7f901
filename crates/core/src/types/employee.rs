//! Employee records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::id::{EmployeeId, ImageId};
use super::user::User;

/// An image attached to an employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ImageId>,
    pub url: String,
}

/// An employee as exchanged with the backend (`Empleado`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EmployeeId>,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "apellido")]
    pub surname: String,
    #[serde(rename = "telefono")]
    pub phone: String,
    #[serde(rename = "fechaNacimiento")]
    pub birth_date: NaiveDate,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "imagenes", default)]
    pub images: Vec<Image>,
    /// The account this employee logs in with.
    #[serde(rename = "usuario", default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl Employee {
    /// Link the employee to a freshly created account.
    ///
    /// The employee's email always mirrors the account's.
    pub fn attach_account(&mut self, account: User) {
        self.email.clone_from(&account.email);
        self.user = Some(account);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{Role, UserId};

    fn employee() -> Employee {
        Employee {
            id: None,
            name: "Lucia".to_string(),
            surname: "Gomez".to_string(),
            phone: "2615550000".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1995, 4, 12).unwrap(),
            email: String::new(),
            images: Vec::new(),
            user: None,
        }
    }

    #[test]
    fn test_serializes_backend_field_names() {
        let value = serde_json::to_value(employee()).unwrap();
        assert_eq!(value["nombre"], "Lucia");
        assert_eq!(value["apellido"], "Gomez");
        assert_eq!(value["telefono"], "2615550000");
        assert_eq!(value["fechaNacimiento"], "1995-04-12");
        assert!(value.get("id").is_none());
        assert!(value.get("usuario").is_none());
    }

    #[test]
    fn test_attach_account_copies_email() {
        let mut emp = employee();
        emp.attach_account(User {
            id: Some(UserId::new(9)),
            auth0_id: "auth0|9".to_string(),
            username: "lucia".to_string(),
            email: "lucia@buensabor.com".to_string(),
            rol: Some(Role::Cocinero),
        });

        assert_eq!(emp.email, "lucia@buensabor.com");
        assert_eq!(emp.user.as_ref().and_then(|u| u.id), Some(UserId::new(9)));
    }
}
