use crate::modules::pledges::core::errors::ValidationError;
use crate::modules::pledges::core::pledge::NewPledge;

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Accepted { pledge: NewPledge },
    Rejected { reason: ValidationError },
}
