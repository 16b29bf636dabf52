use crate::modules::pledges::core::errors::ValidationError;
use crate::modules::pledges::core::pledge::NewPledge;
use crate::modules::pledges::use_cases::submit_pledge::command::SubmitPledge;
use crate::modules::pledges::use_cases::submit_pledge::decision::Decision;

/// `session_locked` is true when this session already pledged and only one pledge is allowed.
pub fn decide_submit(command: &SubmitPledge, session_locked: bool) -> Decision {
    if session_locked {
        return Decision::Rejected {
            reason: ValidationError::AlreadySubmitted,
        };
    }

    let name = command.name.trim();
    if name.is_empty() {
        return Decision::Rejected {
            reason: ValidationError::EmptyName,
        };
    }

    let raw = command.monthly_amount.trim();
    let monthly_amount = match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v,
        _ => {
            return Decision::Rejected {
                reason: ValidationError::InvalidAmount(raw.to_string()),
            };
        }
    };

    Decision::Accepted {
        pledge: NewPledge {
            name: name.to_string(),
            monthly_amount,
        },
    }
}
