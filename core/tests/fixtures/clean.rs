use stylus_sdk::{
    alloy_primitives::{Address, U256},
    msg,
    prelude::*,
};

sol_interface! {
    interface IERC20 {
        function transfer(address to, uint256 value) external returns (bool);
    }
}

#[public]
impl Treasury {
    pub fn claim(&mut self, token: IERC20, amount: U256) -> Result<(), Vec<u8>> {
        let ok = token.transfer(self, msg::sender(), amount)?;
        if !ok {
            return Err(b"claim failed".to_vec());
        }
        Ok(())
    }

    pub fn pay(&mut self, token: IERC20, to: Address, amount: U256) -> Result<(), Vec<u8>> {
        if to == Address::ZERO {
            return Err(b"zero recipient".to_vec());
        }
        match token.transfer(self, to, amount) {
            Ok(true) => Ok(()),
            Ok(false) => Err(b"transfer returned false".to_vec()),
            Err(e) => Err(e.into()),
        }
    }
}
