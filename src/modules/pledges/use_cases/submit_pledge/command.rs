use crate::modules::pledges::core::pledge::DEFAULT_AMOUNT;

/// The pledge form as typed by the visitor. The amount stays text until it is decided on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitPledge {
    pub name: String,
    pub monthly_amount: String,
}

impl SubmitPledge {
    pub fn new(name: impl Into<String>, monthly_amount: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            monthly_amount: monthly_amount.into(),
        }
    }

    /// Mirrors the disabled state of the submit button.
    pub fn is_filled_in(&self) -> bool {
        !self.name.trim().is_empty() && !self.monthly_amount.trim().is_empty()
    }
}

impl Default for SubmitPledge {
    fn default() -> Self {
        Self {
            name: String::new(),
            monthly_amount: DEFAULT_AMOUNT.to_string(),
        }
    }
}

#[cfg(test)]
mod submit_pledge_command_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn it_should_start_blank_with_the_default_amount() {
        let form = SubmitPledge::default();
        assert_eq!(form.name, "");
        assert_eq!(form.monthly_amount, "12");
        assert!(!form.is_filled_in());
    }

    #[rstest]
    #[case("Alice", "12", true)]
    #[case("   ", "12", false)]
    #[case("Alice", "", false)]
    fn it_should_know_when_it_is_filled_in(
        #[case] name: &str,
        #[case] amount: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(SubmitPledge::new(name, amount).is_filled_in(), expected);
    }
}
