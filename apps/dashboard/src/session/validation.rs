//! Client-side form checks. Failures here never reach the network.

use crate::errors::ClientError;
use crate::models::{SignInRequest, SignUpRequest};

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn sign_in(request: &SignInRequest) -> Result<(), ClientError> {
    email(&request.email)?;
    if request.password.is_empty() {
        return Err(invalid("Please enter your password"));
    }
    Ok(())
}

pub fn sign_up(request: &SignUpRequest) -> Result<(), ClientError> {
    if request.full_name.trim().is_empty() {
        return Err(invalid("Please enter your full name"));
    }
    email(&request.email)?;
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(invalid(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn email(value: &str) -> Result<(), ClientError> {
    let value = value.trim();
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(invalid("Please enter a valid email address"))
    }
}

fn invalid(message: impl Into<String>) -> ClientError {
    ClientError::Validation(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_shapes() {
        assert!(email("a@b.com").is_ok());
        assert!(email(" user@mail.example.org ").is_ok());
        assert!(email("a@b").is_err());
        assert!(email("@b.com").is_err());
        assert!(email("a@.com").is_err());
        assert!(email("plain").is_err());
    }

    #[test]
    fn test_sign_up_password_length() {
        assert!(sign_up(&SignUpRequest::new("A", "a@b.com", "secret1")).is_ok());
        let err = sign_up(&SignUpRequest::new("A", "a@b.com", "12345")).unwrap_err();
        assert_eq!(err.user_message(), "Password must be at least 6 characters");
    }

    #[test]
    fn test_sign_up_requires_name() {
        assert!(sign_up(&SignUpRequest::new("  ", "a@b.com", "secret1")).is_err());
    }

    #[test]
    fn test_sign_in_requires_password() {
        let req = SignInRequest {
            email: "a@b.com".into(),
            password: String::new(),
        };
        assert!(sign_in(&req).is_err());
    }
}
