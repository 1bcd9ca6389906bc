use regex::Regex;

pub fn validate_email(email: &str) -> bool {
    let re = Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
    re.is_match(email)
}

/// Nigerian mobile numbers: 11 digits starting 070/080/081/090/091.
pub fn validate_phone(phone: &str) -> bool {
    let re = Regex::new(r"^0[789][01]\d{8}$").unwrap();
    re.is_match(phone)
}

pub fn validate_password(password: &str) -> bool {
    password.len() >= 8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_nigerian_numbers() {
        assert!(validate_phone("08012345678"));
        assert!(validate_phone("07098765432"));
        assert!(validate_phone("09112345678"));
    }

    #[test]
    fn rejects_malformed_numbers() {
        assert!(!validate_phone("0801234567"));
        assert!(!validate_phone("+2348012345678"));
        assert!(!validate_phone("06012345678"));
    }

    #[test]
    fn validates_emails() {
        assert!(validate_email("ada@example.com"));
        assert!(!validate_email("ada@@example"));
    }
}
