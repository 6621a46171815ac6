//! Fixed-choice slash command options.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{core::status::PaymentStatus, entities::PaymentMethod};

    /// Payment method as offered in the command picker.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
    pub enum MethodChoice {
        #[name = "Pix"]
        Pix,
        #[name = "Cash"]
        Cash,
        #[name = "Other"]
        Other,
    }

    impl From<MethodChoice> for PaymentMethod {
        fn from(choice: MethodChoice) -> Self {
            match choice {
                MethodChoice::Pix => Self::Pix,
                MethodChoice::Cash => Self::Cash,
                MethodChoice::Other => Self::Other,
            }
        }
    }

    /// Derived payment status as offered in the command picker.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
    pub enum StatusChoice {
        #[name = "Paid"]
        Paid,
        #[name = "Pending"]
        Pending,
        #[name = "Overdue"]
        Overdue,
    }

    impl From<StatusChoice> for PaymentStatus {
        fn from(choice: StatusChoice) -> Self {
            match choice {
                StatusChoice::Paid => Self::Paid,
                StatusChoice::Pending => Self::Pending,
                StatusChoice::Overdue => Self::Overdue,
            }
        }
    }
}

pub use inner::*;
