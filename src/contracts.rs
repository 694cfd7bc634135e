//! Centralized Contract Definitions
//!
//! All Solidity interfaces the bot touches, defined with alloy's `sol!`
//! macro. RPC-capable interfaces carry `#[sol(rpc)]`; the EIP-712 order
//! message is a plain sol struct hashed and signed off-chain.
//!
//! Author: AI-Generated
//! Created: 2026-07-28

use alloy::sol;

// ── Uniswap V2 router (price probes) ─────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IUniswapV2Router02 {
        function getAmountsOut(uint256 amountIn, address[] calldata path) external view returns (uint256[] memory amounts);
    }
}

// ── Flash loan arbitrage contract ────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IFlashLoanArbitrage {
        struct FlashLoanParams {
            uint8 strategy;
            address loanAsset;
            uint256 loanAmount;
            address dexRouter1;
            address dexRouter2;
            address[] buyPath;
            address[] sellPath;
            uint256 minOutBuy;
            uint256 minOutSell;
            uint256 minProfit;
            address profitToken;
            uint256 nonce;
            uint256 deadline;
            uint256 maxGasPrice;
        }

        event FlashLoanExecuted(address indexed asset, uint256 amount, uint256 profit);

        function executeFlashLoan(FlashLoanParams calldata params, bytes calldata signature) external returns (uint256 profit);
        function paused() external view returns (bool);
    }
}

// ── EIP-712 order message ────────────────────────────────────────────
// Signed off-chain by the owner key; the contract recovers the signer to
// authorize execution. Field order must match the on-chain type hash.

sol! {
    struct ExecuteFlashLoan {
        uint8 strategy;
        address loanAsset;
        uint256 loanAmount;
        address dexRouter1;
        address dexRouter2;
        bytes32 buyPathHash;
        bytes32 sellPathHash;
        uint256 minOutBuy;
        uint256 minOutSell;
        uint256 minProfit;
        address profitToken;
        uint256 nonce;
        uint256 deadline;
        uint256 maxGasPrice;
    }
}

/// Strategy discriminator understood by the contract. Only plain two-leg
/// arbitrage is produced by this bot.
pub const STRATEGY_ARBITRAGE: u8 = 0;
