use super::{
    ContactRequest, CreateUserRequest, GaragePatch, NewGarage, NewZone, UpdateUserRequest,
    ValidationError, ValidationResult,
};

/// Trait for validating input models
pub trait Validate {
    fn validate(&self) -> ValidationResult<()>;
}

/// Validation constants
pub const MAX_NAME_LENGTH: usize = 200;
pub const MAX_LOCATION_LENGTH: usize = 500;
pub const MAX_MESSAGE_LENGTH: usize = 2000;
pub const MAX_SERVICES_COUNT: usize = 50;
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_EMAIL_LENGTH: usize = 254;

impl Validate for NewGarage {
    fn validate(&self) -> ValidationResult<()> {
        validate_text("zone", &self.zone, MAX_NAME_LENGTH)?;
        validate_text("GarageName", &self.name, MAX_NAME_LENGTH)?;
        validate_text("GarageLocation", &self.location, MAX_LOCATION_LENGTH)?;
        validate_services_count(self.services.len())?;
        Ok(())
    }
}

impl Validate for GaragePatch {
    fn validate(&self) -> ValidationResult<()> {
        validate_optional_text("zone", &self.zone, MAX_NAME_LENGTH)?;
        validate_optional_text("GarageName", &self.name, MAX_NAME_LENGTH)?;
        validate_optional_text("GarageLocation", &self.location, MAX_LOCATION_LENGTH)?;
        if let Some(services) = &self.services {
            validate_services_count(services.len())?;
        }
        Ok(())
    }
}

impl Validate for NewZone {
    fn validate(&self) -> ValidationResult<()> {
        validate_text("zoneName", &self.zone_name, MAX_NAME_LENGTH)?;
        validate_text("uploadedBy", &self.uploaded_by, MAX_NAME_LENGTH)?;
        Ok(())
    }
}

impl Validate for CreateUserRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_text("name", required(&self.name, "name")?, MAX_NAME_LENGTH)?;
        validate_email(required(&self.email, "email")?)?;
        validate_password(required(&self.password, "password")?)?;
        validate_text("type", required(&self.user_type, "type")?, MAX_NAME_LENGTH)?;
        Ok(())
    }
}

impl Validate for UpdateUserRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_optional_text("name", &self.name, MAX_NAME_LENGTH)?;
        if let Some(email) = self.email.as_deref().filter(|e| !e.trim().is_empty()) {
            validate_email(email)?;
        }
        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            validate_password(password)?;
        }
        Ok(())
    }
}

impl Validate for ContactRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_text("name", required(&self.name, "name")?, MAX_NAME_LENGTH)?;
        validate_mobile_number(required(&self.mobile_number, "mobileNumber")?)?;
        validate_text(
            "message",
            required(&self.message, "message")?,
            MAX_MESSAGE_LENGTH,
        )?;
        Ok(())
    }
}

fn required<'a>(value: &'a Option<String>, field: &str) -> ValidationResult<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ValidationError::RequiredField {
            field: field.to_string(),
        })
}

/// Validate a required free-text field
pub fn validate_text(field: &str, value: &str, max_length: usize) -> ValidationResult<()> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: field.to_string(),
        });
    }

    if trimmed.len() > max_length {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max_length,
            actual_length: trimmed.len(),
        });
    }

    if trimmed
        .chars()
        .any(|c| c.is_control() && c != '\n' && c != '\r' && c != '\t')
    {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "Contains invalid control characters".to_string(),
        });
    }

    Ok(())
}

/// Blank optional values mean "keep the stored value" and are always accepted
pub fn validate_optional_text(
    field: &str,
    value: &Option<String>,
    max_length: usize,
) -> ValidationResult<()> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => validate_text(field, v, max_length),
        _ => Ok(()),
    }
}

pub fn validate_services_count(count: usize) -> ValidationResult<()> {
    if count > MAX_SERVICES_COUNT {
        return Err(ValidationError::OutOfRange {
            field: "GarageServices".to_string(),
            min: "0".to_string(),
            max: MAX_SERVICES_COUNT.to_string(),
            value: count.to_string(),
        });
    }
    Ok(())
}

pub fn validate_email(email: &str) -> ValidationResult<()> {
    let trimmed = email.trim();

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max_length: MAX_EMAIL_LENGTH,
            actual_length: trimmed.len(),
        });
    }

    let valid = match trimmed.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !trimmed.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            expected: "local@domain.tld".to_string(),
        });
    }

    Ok(())
}

pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::InvalidValue {
            field: "password".to_string(),
            value: "***".to_string(),
            reason: format!("Must be at least {} characters", MIN_PASSWORD_LENGTH),
        });
    }
    Ok(())
}

pub fn validate_mobile_number(number: &str) -> ValidationResult<()> {
    let trimmed = number.trim();
    let digits = trimmed.chars().filter(char::is_ascii_digit).count();
    let allowed = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'));

    if !allowed || !(7..=15).contains(&digits) {
        return Err(ValidationError::InvalidFormat {
            field: "mobileNumber".to_string(),
            expected: "7 to 15 digits, optionally with + - ( ) and spaces".to_string(),
        });
    }

    Ok(())
}
