use alloy::sol;

sol! {
    #[sol(rpc)]
    #[derive(Debug)]
    interface IGatewayWallet {
        /// Deposits `value` of `token` on behalf of the sender.
        ///
        /// Requires a prior ERC-20 approval of at least `value` to the wallet.
        function deposit(address token, uint256 value) external;

        /// Returns the unified balance of `depositor` on this chain that is not locked by a
        /// pending withdrawal.
        function availableBalance(address token, address depositor) external view returns (uint256);
    }

    #[sol(rpc)]
    #[derive(Debug)]
    interface IGatewayMinter {
        /// Mints the funds of an attested burn intent on the destination chain.
        function gatewayMint(bytes attestationPayload, bytes signature) external;
    }

    #[sol(rpc)]
    #[derive(Debug)]
    interface IERC20 {
        function approve(address spender, uint256 value) external returns (bool);
        function balanceOf(address owner) external view returns (uint256);
    }
}
