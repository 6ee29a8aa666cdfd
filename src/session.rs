use crate::api::{ApiResult, AuthResponse, Credentials, MeResponse, Registration};
use crate::data::AuthService;
use crate::notify::Notifier;

pub const USERNAME_MIN_CHARS: usize = 2;
pub const USERNAME_MAX_CHARS: usize = 20;
pub const PASSWORD_MIN_CHARS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Username must be 2-20 characters")]
    UsernameLength,
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
}

/// Registration is checked locally before anything is sent; login is not.
pub fn validate_registration(registration: &Registration) -> Result<(), ValidationError> {
    let name_len = registration.username.chars().count();
    if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&name_len) {
        return Err(ValidationError::UsernameLength);
    }
    if registration.password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

/// The session flag: who the backend says is signed in, if anyone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in<S: Into<String>>(username: S) -> Self {
        Self {
            user: Some(username.into()),
        }
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref().filter(|name| !name.is_empty())
    }

    pub fn is_logged_in(&self) -> bool {
        self.user().is_some()
    }

    pub fn check_status(&mut self, auth: &dyn AuthService) {
        self.apply_status(auth.status());
    }

    pub fn apply_status(&mut self, result: ApiResult<MeResponse>) {
        match result {
            Ok(me) if me.logged_in => self.user = me.username,
            Ok(_) => self.user = None,
            Err(err) => {
                tracing::error!(error = %err, "session status check failed");
                self.user = None;
            }
        }
    }

    pub fn finish_login(
        &mut self,
        result: ApiResult<AuthResponse>,
        notifier: &mut Notifier,
    ) -> bool {
        match result {
            Ok(resp) => {
                tracing::info!(user = %resp.username, "logged in");
                self.user = Some(resp.username);
                notifier.success("Welcome back!");
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "login failed");
                notifier.error(err.user_message("Login failed"));
                false
            }
        }
    }

    /// Validates the form; on failure the reason is shown and nothing should
    /// be sent.
    pub fn begin_register(form: &RegisterForm, notifier: &mut Notifier) -> Option<Registration> {
        let registration = form.registration();
        match validate_registration(&registration) {
            Ok(()) => Some(registration),
            Err(err) => {
                notifier.error(err.to_string());
                None
            }
        }
    }

    pub fn finish_register(
        &mut self,
        result: ApiResult<AuthResponse>,
        notifier: &mut Notifier,
    ) -> bool {
        match result {
            Ok(resp) => {
                tracing::info!(user = %resp.username, "registered");
                self.user = Some(resp.username);
                notifier.success("Registration successful, welcome!");
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "registration failed");
                notifier.error(err.user_message("Registration failed"));
                false
            }
        }
    }

    pub fn finish_logout(&mut self, result: ApiResult<()>, notifier: &mut Notifier) -> bool {
        match result {
            Ok(()) => {
                self.user = None;
                notifier.info("Logged out");
                true
            }
            Err(err) => {
                tracing::error!(error = %err, "logout failed");
                notifier.error("Logout failed");
                false
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
    #[default]
    Username,
    Password,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub active: LoginField,
}

impl LoginForm {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }

    pub fn next(&mut self) {
        self.active = match self.active {
            LoginField::Username => LoginField::Password,
            LoginField::Password => LoginField::Username,
        };
    }

    pub fn active_index(&self) -> usize {
        self.active as usize
    }

    fn active_value_mut(&mut self) -> &mut String {
        match self.active {
            LoginField::Username => &mut self.username,
            LoginField::Password => &mut self.password,
        }
    }

    pub fn insert_char(&mut self, ch: char) {
        self.active_value_mut().push(ch);
    }

    pub fn backspace(&mut self) {
        self.active_value_mut().pop();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegisterField {
    #[default]
    Username,
    Email,
    Password,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub active: RegisterField,
}

impl RegisterForm {
    pub fn registration(&self) -> Registration {
        Registration {
            username: self.username.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }

    pub fn next(&mut self) {
        self.active = match self.active {
            RegisterField::Username => RegisterField::Email,
            RegisterField::Email => RegisterField::Password,
            RegisterField::Password => RegisterField::Username,
        };
    }

    pub fn active_index(&self) -> usize {
        self.active as usize
    }

    fn active_value_mut(&mut self) -> &mut String {
        match self.active {
            RegisterField::Username => &mut self.username,
            RegisterField::Email => &mut self.email,
            RegisterField::Password => &mut self.password,
        }
    }

    pub fn insert_char(&mut self, ch: char) {
        self.active_value_mut().push(ch);
    }

    pub fn backspace(&mut self) {
        self.active_value_mut().pop();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
