use alloy_primitives::{Address, Bytes};

use crate::RejectReason;

/// The decoded fee-payer descriptor of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeePayerDescriptor {
    /// The fee payer
    pub paymaster: Address,
    /// The token the sender is billed in, when named
    pub token: Option<Address>,
    /// Data after the token address
    pub extra: Bytes,
}

impl FeePayerDescriptor {
    /// Parses `paymasterAndData`. An empty descriptor means the sender funds itself. A token
    /// address, when present, must be complete.
    pub fn parse(data: &Bytes) -> Result<Option<Self>, RejectReason> {
        if data.is_empty() {
            return Ok(None);
        }
        if data.len() < 20 || (data.len() > 20 && data.len() < 40) {
            return Err(RejectReason::InvalidPaymasterAndData);
        }
        let paymaster = Address::from_slice(&data[..20]);
        let token = (data.len() >= 40).then(|| Address::from_slice(&data[20..40]));
        let extra = if data.len() > 40 { data.slice(40..) } else { Bytes::new() };
        Ok(Some(Self { paymaster, token, extra }))
    }

    /// Encodes a descriptor naming `paymaster` and `token`.
    pub fn encode(paymaster: Address, token: Address) -> Bytes {
        let mut data = Vec::with_capacity(40);
        data.extend_from_slice(paymaster.as_slice());
        data.extend_from_slice(token.as_slice());
        data.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_parse() {
        let paymaster = address!("0x3000000000000000000000000000000000000003");
        let token = address!("0x4000000000000000000000000000000000000004");

        assert_eq!(FeePayerDescriptor::parse(&Bytes::new()), Ok(None));
        assert_eq!(
            FeePayerDescriptor::parse(&Bytes::from(vec![1u8; 19])),
            Err(RejectReason::InvalidPaymasterAndData)
        );

        let mut truncated = FeePayerDescriptor::encode(paymaster, token).to_vec();
        truncated.truncate(39);
        assert_eq!(
            FeePayerDescriptor::parse(&Bytes::from(truncated)),
            Err(RejectReason::InvalidPaymasterAndData)
        );
        assert_eq!(
            FeePayerDescriptor::parse(&Bytes::from(vec![1u8; 21])),
            Err(RejectReason::InvalidPaymasterAndData)
        );

        let only_paymaster = FeePayerDescriptor::parse(&Bytes::copy_from_slice(paymaster.as_slice()))
            .unwrap()
            .unwrap();
        assert_eq!(only_paymaster.token, None);

        let parsed =
            FeePayerDescriptor::parse(&FeePayerDescriptor::encode(paymaster, token)).unwrap().unwrap();
        assert_eq!(parsed.paymaster, paymaster);
        assert_eq!(parsed.token, Some(token));
        assert!(parsed.extra.is_empty());
    }
}
