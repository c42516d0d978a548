// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::{
    ContactMethod, CountryCode, CustomerContact, DomainError, PostalCode, ServiceAddress,
    validate_customer_contact, validate_email, validate_phone, validate_service_address,
};

fn create_test_customer() -> CustomerContact {
    CustomerContact {
        name: String::from("Jordan Reyes"),
        phone: String::from("(512) 555-0142"),
        email: Some(String::from("jordan@example.com")),
        preferred_contact_method: ContactMethod::Sms,
        sms_consent: true,
        email_consent: false,
    }
}

fn create_test_address() -> ServiceAddress {
    ServiceAddress {
        street: String::from("1100 Congress Ave"),
        unit: None,
        city: String::from("Austin"),
        region: String::from("TX"),
        postal_code: PostalCode::parse(CountryCode::Us, "78701").unwrap(),
    }
}

#[test]
fn test_validate_customer_accepts_valid_customer() {
    assert!(validate_customer_contact(&create_test_customer()).is_ok());
}

#[test]
fn test_validate_customer_accepts_missing_email() {
    let mut customer: CustomerContact = create_test_customer();
    customer.email = None;
    assert!(validate_customer_contact(&customer).is_ok());
}

#[test]
fn test_validate_customer_rejects_blank_name() {
    let mut customer: CustomerContact = create_test_customer();
    customer.name = String::from("   ");
    assert!(matches!(
        validate_customer_contact(&customer),
        Err(DomainError::InvalidCustomerField {
            field: "customer_name",
            ..
        })
    ));
}

#[test]
fn test_validate_phone_digit_bounds() {
    assert!(validate_phone("512-555-0142").is_ok());
    assert!(validate_phone("+44 20 7946 0958").is_ok());
    assert!(validate_phone("555-0142").is_err());
    assert!(validate_phone("1234567890123456").is_err());
}

#[test]
fn test_validate_phone_rejects_letters() {
    assert!(matches!(
        validate_phone("512-555-CALL"),
        Err(DomainError::InvalidCustomerField {
            field: "customer_phone",
            ..
        })
    ));
}

#[test]
fn test_validate_email_shapes() {
    assert!(validate_email("a@b.co").is_ok());
    assert!(validate_email("no-at-sign.com").is_err());
    assert!(validate_email("@example.com").is_err());
    assert!(validate_email("user@localhost").is_err());
    assert!(validate_email("user@example..com").is_err());
    assert!(validate_email("user name@example.com").is_err());
}

#[test]
fn test_validate_address_rejects_blank_street() {
    let mut address: ServiceAddress = create_test_address();
    assert!(validate_service_address(&address).is_ok());
    address.street = String::new();
    assert!(matches!(
        validate_service_address(&address),
        Err(DomainError::InvalidCustomerField { field: "street", .. })
    ));
}
