//! ABI bindings for the calls the engine dispatches and the events it emits.

use alloy_sol_types::sol;

sol! {
    /// Stake manager and settlement surface of the entry point.
    interface IEntryPoint {
        event Deposited(address indexed account, uint256 totalDeposit);
        event Withdrawn(address indexed account, address withdrawAddress, uint256 amount);
        event StakeLocked(address indexed account, uint256 totalStaked, uint256 unstakeDelaySec);
        event StakeUnlocked(address indexed account, uint256 withdrawTime);
        event StakeWithdrawn(address indexed account, address withdrawAddress, uint256 amount);
        event AccountDeployed(bytes32 indexed userOpHash, address indexed sender, address factory, address paymaster);
        event UserOperationEvent(
            bytes32 indexed userOpHash,
            address indexed sender,
            address indexed paymaster,
            uint256 nonce,
            bool success,
            uint256 actualGasCost,
            uint256 actualGasUsed
        );
        event UserOperationRevertReason(bytes32 indexed userOpHash, address indexed sender, uint256 nonce, bytes revertReason);

        function depositTo(address account) external payable;
        function withdrawTo(address withdrawAddress, uint256 withdrawAmount) external;
        function addStake(uint32 unstakeDelaySec) external payable;
        function unlockStake() external;
        function withdrawStake(address withdrawAddress) external;
        function incrementNonce(uint192 key) external;
        function balanceOf(address account) external view returns (uint256);
        function getNonce(address sender, uint192 key) external view returns (uint256 nonce);
    }

    /// Token deposit surface of a fee payer.
    interface ITokenPaymaster {
        event TokenDepositAdded(address indexed token, address indexed account, uint256 amount);
        event TokenDepositLocked(address indexed account);
        event TokenDepositUnlocked(address indexed account, uint256 unlockBlock);
        event TokensWithdrawn(address indexed token, address indexed account, address target, uint256 amount);
        event TokenFeeCharged(address indexed account, address indexed token, uint256 tokenCost, uint256 actualGasCost);

        function addDepositFor(address token, address account, uint256 amount) external;
        function lockTokenDeposit() external;
        function unlockTokenDeposit() external;
        function withdrawTokensTo(address token, address target, uint256 amount) external;
    }

    /// Minimal ERC-20.
    interface IERC20 {
        event Transfer(address indexed from, address indexed to, uint256 value);
        event Approval(address indexed owner, address indexed spender, uint256 value);

        function transfer(address to, uint256 amount) external returns (bool);
        function approve(address spender, uint256 amount) external returns (bool);
        function transferFrom(address from, address to, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
    }

    /// Call forwarding surface of an account.
    interface IAccount {
        function execute(address dest, uint256 value, bytes func) external;
        function executeBatch(address[] dest, bytes[] func) external;
    }

    /// Deterministic account deployment.
    interface IAccountFactory {
        event AccountCreated(address indexed account, address indexed owner, uint256 salt);

        function createAccount(address owner, uint256 salt) external returns (address ret);
        function getAddress(address owner, uint256 salt) external view returns (address);
    }
}
