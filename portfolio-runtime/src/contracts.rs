//! Solidity contract bindings for the on-chain portfolio system.
//!
//! Uses alloy's `sol!` macro to generate type-safe ABI encoders/decoders
//! for the automated portfolio contract and the test USDC token.

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IAutomatedPortfolio {
        function getAllocations() external view returns (string[] memory categories, uint256[] memory percentages);
        function updateAllocations(string[] calldata categories, uint256[] calldata percentages) external;
        function owner() external view returns (address);
    }

    #[sol(rpc)]
    interface ITestUSDC {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function decimals() external view returns (uint8);
        function faucet() external;
    }
}
