//! Credential form state and the sign-up / log-in flow.
//!
//! The form itself is plain data the UI owns in a signal. Submitting is split into
//! three steps so the UI can hold no borrow across the network call:
//!
//! 1. [`CredentialForm::begin_submit`] validates, sets `loading` and hands out the
//!    credentials (or nothing if a submission is already in flight).
//! 2. [`authenticate`] talks to the auth service and classifies the result.
//! 3. [`CredentialForm::finish_submit`] clears `loading` and records the message.

use api::{ApiError, AuthApi};

use crate::policy::RequestPolicy;

pub const VERIFY_EMAIL_MESSAGE: &str = "Please verify your email before logging in.";
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthMode {
    #[default]
    SignUp,
    LogIn,
}

impl AuthMode {
    pub fn toggled(self) -> Self {
        match self {
            AuthMode::SignUp => AuthMode::LogIn,
            AuthMode::LogIn => AuthMode::SignUp,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            AuthMode::SignUp => "Sign Up",
            AuthMode::LogIn => "Log In",
        }
    }

    pub fn submit_label(self) -> &'static str {
        match self {
            AuthMode::SignUp => "Create account",
            AuthMode::LogIn => "Log in",
        }
    }

    pub fn switch_label(self) -> &'static str {
        match self {
            AuthMode::SignUp => "Switch to Login",
            AuthMode::LogIn => "Switch to Signup",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// How a submission ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Signed in with a verified account; go to the dashboard.
    Navigate,
    /// The account exists but its email is not confirmed yet.
    VerificationPending,
    /// The auth service refused the credentials.
    Rejected(String),
    /// The call never produced an answer.
    Failed(String),
}

impl SubmitOutcome {
    pub fn message(&self) -> Option<&str> {
        match self {
            SubmitOutcome::Navigate => None,
            SubmitOutcome::VerificationPending => Some(VERIFY_EMAIL_MESSAGE),
            SubmitOutcome::Rejected(message) | SubmitOutcome::Failed(message) => Some(message),
        }
    }

    pub fn should_navigate(&self) -> bool {
        matches!(self, SubmitOutcome::Navigate)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CredentialForm {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
    pub loading: bool,
    pub message: Option<String>,
}

impl CredentialForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip between sign-up and log-in, keeping what was typed and the last message.
    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggled();
    }

    pub fn submit_label(&self) -> &'static str {
        if self.loading {
            "Please wait..."
        } else {
            self.mode.submit_label()
        }
    }

    /// Start a submission. Returns `None` while one is in flight or the input is incomplete.
    pub fn begin_submit(&mut self) -> Option<Credentials> {
        if self.loading {
            return None;
        }
        let email = self.email.trim();
        if email.is_empty() {
            self.message = Some("Email is required".to_string());
            return None;
        }
        if self.password.is_empty() {
            self.message = Some("Password is required".to_string());
            return None;
        }

        self.loading = true;
        self.message = None;
        Some(Credentials {
            email: email.to_string(),
            password: self.password.clone(),
        })
    }

    pub fn finish_submit(&mut self, outcome: &SubmitOutcome) {
        self.loading = false;
        self.message = outcome.message().map(str::to_string);
    }
}

/// Sign up or log in, and decide where the user goes next.
pub async fn authenticate<A: AuthApi>(
    auth: &A,
    policy: &RequestPolicy,
    mode: AuthMode,
    credentials: &Credentials,
) -> SubmitOutcome {
    let Credentials { email, password } = credentials;
    let result = match mode {
        AuthMode::SignUp => policy.mutation(auth.sign_up(email, password)).await,
        AuthMode::LogIn => {
            policy
                .mutation(auth.sign_in_with_password(email, password))
                .await
        }
    };

    let response = match result {
        Ok(response) => response,
        Err(ApiError::Auth { message, .. }) => {
            tracing::info!(?mode, "Credentials rejected: {}", message);
            return SubmitOutcome::Rejected(message);
        }
        Err(e) => {
            tracing::error!(?mode, "Authentication request failed: {}", e);
            return SubmitOutcome::Failed(format!("{GENERIC_FAILURE_MESSAGE}: {e}"));
        }
    };

    match (response.email_verified(), response.session.is_some()) {
        (Some(false), _) | (_, false) => {
            tracing::info!(?mode, "Account awaiting email verification");
            SubmitOutcome::VerificationPending
        }
        (_, true) => {
            tracing::info!(?mode, "Authenticated");
            SubmitOutcome::Navigate
        }
    }
}
