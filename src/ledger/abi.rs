//! Contract interfaces the engine talks to

use alloy_sol_types::sol;

sol! {
    /// Launchpad asset with an embedded bonding curve
    #[derive(Debug, PartialEq, Eq)]
    interface IBondingCurve {
        function getBuyQuote(uint256 amountIn) external view returns (uint256 amountOut, uint256 fee);
        function getSellQuote(uint256 amountIn) external view returns (uint256 amountOut, uint256 fee);
        function buy(uint256 minAmountOut) external payable returns (uint256 amountOut);
        function sell(uint256 amountIn, uint256 minAmountOut) external returns (uint256 amountOut);
        function isGraduated() external view returns (bool);
        function curveState() external view returns (uint256 virtualReserveIn, uint256 virtualReserveOut, uint256 targetIn, bool graduated);
    }

    /// Uniswap-V2 style router used after graduation
    #[derive(Debug, PartialEq, Eq)]
    interface IRouter {
        function getAmountsOut(uint256 amountIn, address[] calldata path) external view returns (uint256[] memory amounts);
        function swapExactETHForTokensSupportingFeeOnTransferTokens(uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external payable;
        function swapExactTokensForETHSupportingFeeOnTransferTokens(uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external;
    }

    #[derive(Debug, PartialEq, Eq)]
    interface IERC20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 value) external returns (bool);
        function balanceOf(address owner) external view returns (uint256);
    }

    /// Deterministic launchpad factory
    #[derive(Debug, PartialEq, Eq)]
    interface ITokenFactory {
        struct CreationParams {
            string name;
            string symbol;
            bytes32 metadataHash;
            address creator;
        }

        function predictTokenAddress(CreationParams calldata params, bytes32 salt) external view returns (address);
        function createToken(CreationParams calldata params, bytes32 salt) external payable returns (address token);
    }
}
