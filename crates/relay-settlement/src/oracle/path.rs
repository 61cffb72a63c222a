use alloy_primitives::{Address, Bytes};

use crate::OracleError;

const ADDR_SIZE: usize = 20;
const FEE_SIZE: usize = 3;
const HOP_SIZE: usize = ADDR_SIZE + FEE_SIZE;

/// A multi-hop pool path: `token(20) | fee(3) | token(20) | ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotePath {
    /// Tokens visited, input first
    pub tokens: Vec<Address>,
    /// Pool fee tier of each hop, in hundredths of a basis point
    pub fees: Vec<u32>,
}

impl QuotePath {
    /// Creates a path, checking there is one fee per hop and fees fit in 24 bits.
    pub fn new(tokens: Vec<Address>, fees: Vec<u32>) -> Result<Self, OracleError> {
        if tokens.len() < 2 || tokens.len() != fees.len() + 1 {
            return Err(OracleError::InvalidPath("path/fee lengths do not match"));
        }
        if fees.iter().any(|fee| *fee >= 1 << 24) {
            return Err(OracleError::InvalidPath("fee does not fit in 24 bits"));
        }
        Ok(Self { tokens, fees })
    }

    /// The token swapped in.
    pub fn input(&self) -> Address {
        self.tokens.first().copied().unwrap_or_default()
    }

    /// The token received.
    pub fn output(&self) -> Address {
        self.tokens.last().copied().unwrap_or_default()
    }

    /// Packs the path.
    pub fn encode(&self) -> Bytes {
        let mut out = Vec::with_capacity(ADDR_SIZE + self.fees.len() * HOP_SIZE);
        for (token, fee) in self.tokens.iter().zip(&self.fees) {
            out.extend_from_slice(token.as_slice());
            out.extend_from_slice(&fee.to_be_bytes()[1..]);
        }
        out.extend_from_slice(self.output().as_slice());
        out.into()
    }

    /// Unpacks a path.
    pub fn decode(data: &[u8]) -> Result<Self, OracleError> {
        if data.len() < ADDR_SIZE + HOP_SIZE || (data.len() - ADDR_SIZE) % HOP_SIZE != 0 {
            return Err(OracleError::InvalidPath("malformed path length"));
        }
        let hops = (data.len() - ADDR_SIZE) / HOP_SIZE;
        let mut tokens = Vec::with_capacity(hops + 1);
        let mut fees = Vec::with_capacity(hops);
        for hop in data[..hops * HOP_SIZE].chunks_exact(HOP_SIZE) {
            tokens.push(Address::from_slice(&hop[..ADDR_SIZE]));
            fees.push(u32::from_be_bytes([0, hop[20], hop[21], hop[22]]));
        }
        tokens.push(Address::from_slice(&data[hops * HOP_SIZE..]));
        Ok(Self { tokens, fees })
    }
}
