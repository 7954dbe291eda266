//! Token vault with a mix of checked and unchecked payouts.

extern crate alloc;

use stylus_sdk::{
    alloy_primitives::{Address, U256},
    alloy_sol_types::sol,
    msg,
    prelude::*,
};

sol_interface! {
    interface IERC20 {
        function transfer(address to, uint256 value) external returns (bool);
        function transferFrom(address from, address to, uint256 value) external returns (bool);
    }
}

sol! {
    contract Payouts {
        function unsafeTransferERC20(address token, address to, uint256 amount) public {
            token.call(abi.encodeWithSignature("transfer(address,uint256)", to, amount));
        }

        function safeTransferERC20(address token, address to, uint256 amount) public {
            (bool success, bytes memory data) = token.call(abi.encodeWithSignature("transfer(address,uint256)", to, amount));
            require(success, "ERC20 transfer failed");
        }
    }
}

#[public]
impl Vault {
    pub fn sweep(&mut self, token: IERC20, to: Address, amount: U256) -> Result<(), Vec<u8>> {
        let _ = token.transfer(self, to, amount);
        Ok(())
    }

    pub fn withdraw(&mut self, token: IERC20, amount: U256) -> Result<(), Vec<u8>> {
        let success = token.transfer(self, msg::sender(), amount)?;
        if !success {
            return Err(b"transfer failed".to_vec());
        }
        Ok(())
    }

    pub fn refund(&mut self, token: IERC20, to: Address, amount: U256) -> Result<(), Vec<u8>> {
        match token.transfer(self, to, amount) {
            Ok(_) => {}
            Err(_) => {}
        }
        Ok(())
    }
}
