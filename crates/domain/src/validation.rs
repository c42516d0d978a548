// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::booking::{CustomerContact, ServiceAddress};
use crate::error::DomainError;

const MIN_PHONE_DIGITS: usize = 10;
const MAX_PHONE_DIGITS: usize = 15;

/// Validates customer contact fields.
///
/// # Arguments
///
/// * `customer` - The contact details to validate
///
/// # Errors
///
/// Returns an error if:
/// - The name is blank
/// - The phone number does not carry 10 to 15 digits
/// - The email, when present, lacks a local part or a dotted domain
pub fn validate_customer_contact(customer: &CustomerContact) -> Result<(), DomainError> {
    if customer.name.trim().is_empty() {
        return Err(DomainError::InvalidCustomerField {
            field: "customer_name",
            reason: String::from("must not be empty"),
        });
    }

    validate_phone(&customer.phone)?;

    if let Some(email) = &customer.email {
        validate_email(email)?;
    }

    Ok(())
}

/// Validates a phone number by counting its digits.
///
/// Separators such as spaces, dashes, dots, parentheses and a leading `+` are
/// accepted; any other character is rejected.
///
/// # Errors
///
/// Returns `DomainError::InvalidCustomerField` for `customer_phone`.
pub fn validate_phone(phone: &str) -> Result<(), DomainError> {
    let invalid = |reason: &str| DomainError::InvalidCustomerField {
        field: "customer_phone",
        reason: reason.to_string(),
    };

    if phone
        .chars()
        .any(|c| !(c.is_ascii_digit() || matches!(c, ' ' | '-' | '.' | '(' | ')' | '+')))
    {
        return Err(invalid("contains unexpected characters"));
    }

    let digits: usize = phone.chars().filter(char::is_ascii_digit).count();
    if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits) {
        return Err(invalid("must contain between 10 and 15 digits"));
    }
    Ok(())
}

/// Validates the shape of an email address.
///
/// # Errors
///
/// Returns `DomainError::InvalidCustomerField` for `customer_email`.
pub fn validate_email(email: &str) -> Result<(), DomainError> {
    let invalid = || DomainError::InvalidCustomerField {
        field: "customer_email",
        reason: format!("'{email}' is not a valid email address"),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err(invalid());
    };
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let dotted: bool = domain
        .split('.')
        .all(|label| !label.is_empty())
        && domain.contains('.');
    if !dotted {
        return Err(invalid());
    }
    Ok(())
}

/// Validates a service address.
///
/// The postal code is already normalized by construction.
///
/// # Errors
///
/// Returns an error if the street or city is blank.
pub fn validate_service_address(address: &ServiceAddress) -> Result<(), DomainError> {
    if address.street.trim().is_empty() {
        return Err(DomainError::InvalidCustomerField {
            field: "street",
            reason: String::from("must not be empty"),
        });
    }
    if address.city.trim().is_empty() {
        return Err(DomainError::InvalidCustomerField {
            field: "city",
            reason: String::from("must not be empty"),
        });
    }
    Ok(())
}
