// Shared test fixture for pledges.
// Defaults come from `json/pledge.json`; setters override single fields.

use crate::modules::pledges::core::pledge::Pledge;

const PLEDGE_JSON: &str = include_str!("json/pledge.json");

pub struct PledgeBuilder {
    inner: Pledge,
}

impl Default for PledgeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl PledgeBuilder {
    pub fn new() -> Self {
        Self {
            inner: serde_json::from_str(PLEDGE_JSON).unwrap(),
        }
    }

    pub fn id(mut self, v: impl Into<String>) -> Self {
        self.inner.id = v.into();
        self
    }

    pub fn name(mut self, v: impl Into<String>) -> Self {
        self.inner.name = v.into();
        self
    }

    pub fn monthly_amount(mut self, v: f64) -> Self {
        self.inner.monthly_amount = v;
        self
    }

    pub fn created_at(mut self, v: i64) -> Self {
        self.inner.created_at = v;
        self
    }

    pub fn build(self) -> Pledge {
        self.inner
    }
}

#[cfg(test)]
mod pledge_builder_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn default_delegates_to_new_and_parses_json() {
        let built = PledgeBuilder::default().build();
        assert_eq!(built.id, "pledge-fixed-0001");
        assert_eq!(built.name, "Alice");
        assert_eq!(built.monthly_amount, 12.0);
        assert_eq!(built.created_at, 1_700_000_000_000i64);
    }

    #[rstest]
    fn setters_override_all_fields_and_build_returns_inner() {
        let custom = PledgeBuilder::new()
            .id("p-123")
            .name("Bob")
            .monthly_amount(19.0)
            .created_at(3333)
            .build();

        assert_eq!(custom.id, "p-123");
        assert_eq!(custom.name, "Bob");
        assert_eq!(custom.monthly_amount, 19.0);
        assert_eq!(custom.created_at, 3333);
    }
}
