//! Spend authorization
//!
//! Addresses are opaque strings and an input's authorization is a plain
//! credential string. The check that ties the two together is a trait so a
//! real signature scheme can replace string equality without touching the
//! chain or the scanner.

use crate::core::{TXInput, TXOutput};

pub trait SpendAuthorizer {
    /// Whether `address` is the owner of `output`.
    fn is_owner(&self, output: &TXOutput, address: &str) -> bool;

    /// Whether `input` carries a credential that unlocks `output`.
    fn can_unlock(&self, input: &TXInput, output: &TXOutput) -> bool;
}

/// Default authorizer: the credential must equal the owner string.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnerEquality;

impl SpendAuthorizer for OwnerEquality {
    fn is_owner(&self, output: &TXOutput, address: &str) -> bool {
        output.get_owner() == address
    }

    fn can_unlock(&self, input: &TXInput, output: &TXOutput) -> bool {
        input.get_authorization() == output.get_owner()
    }
}
