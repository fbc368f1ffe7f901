//! User + employee creation wizard.
//!
//! A linear state machine over three steps:
//!
//! ```text
//! EmployeeDetails --next(valid)--> AccountDetails --next(valid)--> Images
//!        ^                               |   ^                       |
//!        +------------back---------------+   +---------back----------+
//! ```
//!
//! `next` only advances when the current step validates; `back` never
//! validates. Saving is only possible once every step validates, and yields
//! a [`Submission`] ready to be sent to the backend.
//!
//! Rendering is not a concern of this module: the admin crate stores a
//! [`Wizard`] in the session and renders whichever step it is on.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::password::{PasswordError, check_password};
use crate::{AccountDraft, Email, EmailError, Employee, Role};

/// Date format of the birth date input.
pub const BIRTH_DATE_FORMAT: &str = "%Y-%m-%d";

/// Wizard steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Step {
    #[default]
    EmployeeDetails,
    AccountDetails,
    Images,
}

/// Requested movement through the steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Next,
    Back,
}

impl Step {
    /// All steps in order.
    pub const ALL: [Self; 3] = [Self::EmployeeDetails, Self::AccountDetails, Self::Images];

    /// Zero-based position of this step.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::EmployeeDetails => 0,
            Self::AccountDetails => 1,
            Self::Images => 2,
        }
    }

    /// The step at a zero-based position.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[must_use]
    pub const fn is_first(self) -> bool {
        self.index() == 0
    }

    #[must_use]
    pub const fn is_last(self) -> bool {
        self.index() == Self::ALL.len() - 1
    }

    /// Human-readable step title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::EmployeeDetails => "Employee details",
            Self::AccountDetails => "Account details",
            Self::Images => "Images",
        }
    }

    /// Pure transition function.
    ///
    /// `Next` advances only when `valid` and not already on the last step.
    /// `Back` ignores `valid` and stops at the first step.
    #[must_use]
    pub fn transition(self, direction: Direction, valid: bool) -> Self {
        let index = self.index();
        let target = match direction {
            Direction::Next if valid => index + 1,
            Direction::Next => index,
            Direction::Back => index.saturating_sub(1),
        };
        Self::from_index(target).unwrap_or(self)
    }
}

/// Every editable wizard field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Surname,
    Phone,
    BirthDate,
    Email,
    Password,
    Role,
}

impl Field {
    /// All fields, in form order.
    pub const ALL: [Self; 7] = [
        Self::Name,
        Self::Surname,
        Self::Phone,
        Self::BirthDate,
        Self::Email,
        Self::Password,
        Self::Role,
    ];

    /// The step the field is edited on.
    #[must_use]
    pub const fn step(self) -> Step {
        match self {
            Self::Name | Self::Surname | Self::Phone | Self::BirthDate => Step::EmployeeDetails,
            Self::Email | Self::Password | Self::Role => Step::AccountDetails,
        }
    }

    /// Form input name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Surname => "surname",
            Self::Phone => "phone",
            Self::BirthDate => "birth_date",
            Self::Email => "email",
            Self::Password => "password",
            Self::Role => "role",
        }
    }

    /// Look a field up by its form input name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

/// Validation messages keyed by field.
pub type FieldErrors = BTreeMap<Field, String>;

/// Employee fields as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeFields {
    pub name: String,
    pub surname: String,
    pub phone: String,
    pub birth_date: String,
}

/// Account fields as typed by the user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountFields {
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

impl Default for AccountFields {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            role: Some(Role::default()),
        }
    }
}

impl std::fmt::Debug for AccountFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountFields")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

/// A fully validated wizard, ready to send.
#[derive(Debug, Clone)]
pub struct Submission {
    pub account: AccountDraft,
    pub employee: Employee,
}

/// Wizard state: current step, field values and validation errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Wizard {
    step: Step,
    employee: EmployeeFields,
    account: AccountFields,
    errors: FieldErrors,
}

impl Wizard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn step(&self) -> Step {
        self.step
    }

    #[must_use]
    pub const fn employee(&self) -> &EmployeeFields {
        &self.employee
    }

    #[must_use]
    pub const fn account(&self) -> &AccountFields {
        &self.account
    }

    #[must_use]
    pub const fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// The error currently shown for a field, if any.
    #[must_use]
    pub fn error(&self, field: Field) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    /// Current value of a field as typed.
    #[must_use]
    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.employee.name,
            Field::Surname => &self.employee.surname,
            Field::Phone => &self.employee.phone,
            Field::BirthDate => &self.employee.birth_date,
            Field::Email => &self.account.email,
            Field::Password => &self.account.password,
            Field::Role => self.account.role.map_or("", Role::as_str),
        }
    }

    /// Update a field value. Editing a field clears its error.
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::Name => self.employee.name = value,
            Field::Surname => self.employee.surname = value,
            Field::Phone => self.employee.phone = value,
            Field::BirthDate => self.employee.birth_date = value,
            Field::Email => self.account.email = value,
            Field::Password => self.account.password = value,
            Field::Role => self.account.role = value.parse().ok(),
        }
        self.errors.remove(&field);
    }

    /// Validate the current step and advance if it passes.
    ///
    /// Returns whether the step changed.
    pub fn next(&mut self) -> bool {
        let errors = self.validate(self.step);
        let valid = errors.is_empty();
        self.replace_step_errors(self.step, errors);

        let before = self.step;
        self.step = self.step.transition(Direction::Next, valid);
        self.step != before
    }

    /// Go to the previous step without validating anything.
    pub fn back(&mut self) {
        self.step = self.step.transition(Direction::Back, true);
    }

    /// Validate every step and build the submission.
    ///
    /// On failure the wizard moves to the first step with errors so they are
    /// shown where they can be fixed.
    ///
    /// # Errors
    ///
    /// Returns the collected field errors if any step is invalid.
    pub fn submission(&mut self) -> Result<Submission, FieldErrors> {
        let mut errors = FieldErrors::new();
        for step in Step::ALL {
            errors.extend(self.validate(step));
        }

        if let Some(first) = errors.keys().map(|f| f.step()).min_by_key(|s| s.index()) {
            self.errors.clone_from(&errors);
            self.step = first;
            return Err(errors);
        }
        self.errors.clear();

        let birth_date = parse_birth_date(&self.employee.birth_date)
            .ok_or_else(|| single_error(Field::BirthDate, "Birth date must be a valid date"))?;
        let email = Email::parse(&self.account.email)
            .map_err(|e| single_error(Field::Email, email_message(&e)))?;
        let role = self
            .account
            .role
            .ok_or_else(|| single_error(Field::Role, "Role is required"))?;

        Ok(Submission {
            account: AccountDraft {
                email: email.into_inner(),
                password: self.account.password.clone(),
                rol: role,
            },
            employee: Employee {
                id: None,
                name: self.employee.name.trim().to_string(),
                surname: self.employee.surname.trim().to_string(),
                phone: self.employee.phone.trim().to_string(),
                birth_date,
                email: String::new(),
                images: Vec::new(),
                user: None,
            },
        })
    }

    /// Validation errors for a step's required fields. Pure.
    #[must_use]
    pub fn validate(&self, step: Step) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match step {
            Step::EmployeeDetails => {
                let e = &self.employee;
                require(&mut errors, Field::Name, &e.name, "Name is required");
                require(&mut errors, Field::Surname, &e.surname, "Surname is required");
                require(&mut errors, Field::Phone, &e.phone, "Phone is required");
                if e.birth_date.trim().is_empty() {
                    errors.insert(Field::BirthDate, "Birth date is required".to_string());
                } else if parse_birth_date(&e.birth_date).is_none() {
                    errors.insert(
                        Field::BirthDate,
                        "Birth date must be a valid date".to_string(),
                    );
                }
            }
            Step::AccountDetails => {
                let a = &self.account;
                if let Err(e) = Email::parse(&a.email) {
                    errors.insert(Field::Email, email_message(&e).to_string());
                }
                if let Err(e) = check_password(&a.password) {
                    errors.insert(Field::Password, password_message(e).to_string());
                }
                if a.role.is_none() {
                    errors.insert(Field::Role, "Role is required".to_string());
                }
            }
            Step::Images => {}
        }
        errors
    }

    fn replace_step_errors(&mut self, step: Step, errors: FieldErrors) {
        self.errors.retain(|field, _| field.step() != step);
        self.errors.extend(errors);
    }
}

fn require(errors: &mut FieldErrors, field: Field, value: &str, message: &str) {
    if value.trim().is_empty() {
        errors.insert(field, message.to_string());
    }
}

fn single_error(field: Field, message: &str) -> FieldErrors {
    FieldErrors::from([(field, message.to_string())])
}

fn parse_birth_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), BIRTH_DATE_FORMAT).ok()
}

const fn email_message(err: &EmailError) -> &'static str {
    match err {
        EmailError::Empty => "Email is required",
        EmailError::TooLong { .. } | EmailError::Malformed => "Enter a valid email address",
    }
}

const fn password_message(err: PasswordError) -> &'static str {
    match err {
        PasswordError::Empty => "Password is required",
        PasswordError::TooShort => "Password must be at least 8 characters",
        PasswordError::TooFewClasses => {
            "Password must use at least 3 of: uppercase, lowercase, digit or !@#$%^&*"
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fill_employee(w: &mut Wizard) {
        w.set(Field::Name, "Lucia");
        w.set(Field::Surname, "Gomez");
        w.set(Field::Phone, "2615550000");
        w.set(Field::BirthDate, "1995-04-12");
    }

    fn fill_account(w: &mut Wizard) {
        w.set(Field::Email, "lucia@buensabor.com");
        w.set(Field::Password, "Abcdefg1");
        w.set(Field::Role, "Cocinero");
    }

    #[test]
    fn test_transition_table() {
        use Direction::{Back, Next};
        use Step::{AccountDetails, EmployeeDetails, Images};

        assert_eq!(EmployeeDetails.transition(Next, true), AccountDetails);
        assert_eq!(EmployeeDetails.transition(Next, false), EmployeeDetails);
        assert_eq!(AccountDetails.transition(Next, true), Images);
        assert_eq!(Images.transition(Next, true), Images);
        assert_eq!(EmployeeDetails.transition(Back, true), EmployeeDetails);
        for valid in [true, false] {
            assert_eq!(AccountDetails.transition(Back, valid), EmployeeDetails);
            assert_eq!(Images.transition(Back, valid), AccountDetails);
        }
    }

    #[test]
    fn test_next_blocked_by_any_missing_employee_field() {
        for missing in [Field::Name, Field::Surname, Field::Phone, Field::BirthDate] {
            let mut w = Wizard::new();
            fill_employee(&mut w);
            w.set(missing, "   ");

            assert!(!w.next(), "advanced without {missing:?}");
            assert_eq!(w.step(), Step::EmployeeDetails);
            assert!(w.error(missing).is_some());
        }
    }

    #[test]
    fn test_next_rejects_invalid_birth_date() {
        let mut w = Wizard::new();
        fill_employee(&mut w);
        w.set(Field::BirthDate, "12/04/1995");
        assert!(!w.next());
        assert_eq!(w.error(Field::BirthDate), Some("Birth date must be a valid date"));
    }

    #[test]
    fn test_next_advances_when_valid() {
        let mut w = Wizard::new();
        fill_employee(&mut w);
        assert!(w.next());
        assert_eq!(w.step(), Step::AccountDetails);
        assert!(w.errors().is_empty());
    }

    #[test]
    fn test_account_step_password_rules() {
        let mut w = Wizard::new();
        fill_employee(&mut w);
        w.next();
        w.set(Field::Email, "lucia@buensabor.com");

        w.set(Field::Password, "Abcd123");
        assert!(!w.next());
        assert_eq!(
            w.error(Field::Password),
            Some("Password must be at least 8 characters")
        );

        w.set(Field::Password, "abcdefgh");
        assert!(!w.next());
        assert!(w.error(Field::Password).unwrap().contains("at least 3"));

        w.set(Field::Password, "Abcdefg1");
        assert!(w.next());
        assert_eq!(w.step(), Step::Images);
    }

    #[test]
    fn test_account_step_requires_role_and_email() {
        let mut w = Wizard::new();
        fill_employee(&mut w);
        w.next();
        w.set(Field::Password, "Abcdefg1");
        w.set(Field::Role, "");

        assert!(!w.next());
        assert_eq!(w.error(Field::Email), Some("Email is required"));
        assert_eq!(w.error(Field::Role), Some("Role is required"));
    }

    #[test]
    fn test_back_never_validates() {
        let mut w = Wizard::new();
        fill_employee(&mut w);
        w.next();
        // account step is empty and invalid, back still works
        w.set(Field::Email, "");
        w.back();
        assert_eq!(w.step(), Step::EmployeeDetails);

        w.back();
        assert_eq!(w.step(), Step::EmployeeDetails);
    }

    #[test]
    fn test_editing_a_field_clears_its_error() {
        let mut w = Wizard::new();
        w.next();
        assert!(w.error(Field::Name).is_some());
        assert!(w.error(Field::Surname).is_some());

        w.set(Field::Name, "Lucia");
        assert!(w.error(Field::Name).is_none());
        assert!(w.error(Field::Surname).is_some());
    }

    #[test]
    fn test_submission_builds_backend_records() {
        let mut w = Wizard::new();
        fill_employee(&mut w);
        fill_account(&mut w);

        let submission = w.submission().unwrap();
        assert_eq!(submission.account.email, "lucia@buensabor.com");
        assert_eq!(submission.account.rol, Role::Cocinero);
        assert_eq!(submission.employee.name, "Lucia");
        assert_eq!(
            submission.employee.birth_date,
            NaiveDate::from_ymd_opt(1995, 4, 12).unwrap()
        );
        assert!(submission.employee.user.is_none());
    }

    #[test]
    fn test_submission_jumps_to_first_invalid_step() {
        let mut w = Wizard::new();
        fill_account(&mut w);
        w.set(Field::Password, "short");

        let errors = w.submission().unwrap_err();
        assert!(errors.contains_key(&Field::Name));
        assert!(errors.contains_key(&Field::Password));
        assert_eq!(w.step(), Step::EmployeeDetails);
    }

    #[test]
    fn test_unknown_role_is_unselected() {
        let mut w = Wizard::new();
        assert_eq!(w.account().role, Some(Role::Cliente));
        w.set(Field::Role, "Gerente");
        assert_eq!(w.account().role, None);
    }

    #[test]
    fn test_wizard_survives_session_serialization() {
        let mut w = Wizard::new();
        fill_employee(&mut w);
        w.next();
        w.set(Field::Password, "x");
        w.next();

        let json = serde_json::to_string(&w).unwrap();
        let restored: Wizard = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.step(), Step::AccountDetails);
        assert_eq!(restored.employee(), w.employee());
        assert_eq!(restored.errors(), w.errors());
    }

    #[test]
    fn test_value_reflects_set() {
        let mut w = Wizard::new();
        assert_eq!(w.value(Field::Role), "Cliente");
        w.set(Field::Phone, "261");
        w.set(Field::Role, "Delivery");
        assert_eq!(w.value(Field::Phone), "261");
        assert_eq!(w.value(Field::Role), "Delivery");
    }

    #[test]
    fn test_field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::from_name(field.as_str()), Some(field));
        }
        assert_eq!(Field::from_name("action"), None);
    }
}
