//! Request body validation.
//!
//! Rules mirror the public API contract: string fields are trimmed before length
//! checks, and the first violation found is reported as [`ApiError::Validation`].

use crate::{
    error::ApiError,
    models::{
        CreateCategoryRequest, CreateCommentRequest, CreatePostRequest, LoginRequest,
        RegisterUserRequest, UpdateCommentRequest, UpdatePostRequest, UpdateUserRequest,
    },
};

pub trait Validate {
    fn validate(&self) -> Result<(), ApiError>;
}

fn invalid(message: String) -> ApiError {
    ApiError::Validation(message)
}

fn required(label: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(invalid(format!("\"{label}\" is not allowed to be empty")));
    }
    Ok(())
}

fn length(label: &str, value: &str, min: usize, max: Option<usize>) -> Result<(), ApiError> {
    required(label, value)?;
    let len = value.trim().chars().count();
    if len < min {
        return Err(invalid(format!(
            "\"{label}\" length must be at least {min} characters long"
        )));
    }
    if let Some(max) = max {
        if len > max {
            return Err(invalid(format!(
                "\"{label}\" length must be less than or equal to {max} characters long"
            )));
        }
    }
    Ok(())
}

/// Minimal shape check: one `@`, a non-empty local part, and a dotted domain.
pub fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(head, tail)| !head.is_empty() && !tail.is_empty() && !tail.ends_with('.'))
}

fn email(value: &str) -> Result<(), ApiError> {
    length("email", value, 5, Some(100))?;
    if !looks_like_email(value.trim()) {
        return Err(invalid("\"email\" must be a valid email".to_string()));
    }
    Ok(())
}

fn password(value: &str) -> Result<(), ApiError> {
    // Passwords are not trimmed; whitespace is significant.
    if value.chars().count() < 8 {
        return Err(invalid(
            "\"password\" length must be at least 8 characters long".to_string(),
        ));
    }
    Ok(())
}

impl Validate for RegisterUserRequest {
    fn validate(&self) -> Result<(), ApiError> {
        length("username", &self.username, 2, Some(100))?;
        email(&self.email)?;
        password(&self.password)
    }
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), ApiError> {
        email(&self.email)?;
        password(&self.password)
    }
}

impl Validate for UpdateUserRequest {
    fn validate(&self) -> Result<(), ApiError> {
        length("username", &self.username, 2, Some(100))?;
        if let Some(pw) = &self.password {
            password(pw)?;
        }
        Ok(())
    }
}

impl Validate for CreatePostRequest {
    fn validate(&self) -> Result<(), ApiError> {
        length("title", &self.title, 2, Some(100))?;
        length("description", &self.description, 10, None)?;
        required("category", &self.category)
    }
}

impl Validate for UpdatePostRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(title) = &self.title {
            length("title", title, 2, Some(100))?;
        }
        if let Some(description) = &self.description {
            length("description", description, 10, None)?;
        }
        if let Some(category) = &self.category {
            required("category", category)?;
        }
        Ok(())
    }
}

impl Validate for CreateCommentRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.post_id.is_nil() {
            return Err(invalid("\"post_id\" is required".to_string()));
        }
        required("text", &self.text)
    }
}

impl Validate for UpdateCommentRequest {
    fn validate(&self) -> Result<(), ApiError> {
        required("text", &self.text)
    }
}

impl Validate for CreateCategoryRequest {
    fn validate(&self) -> Result<(), ApiError> {
        required("title", &self.title)
    }
}
