//! Typed wrappers over the messages and query routes of each chain module.

mod asset;
mod auth;
mod bank;
mod slashing;
mod staking;
mod wasm;

pub use asset::{AssetFt, AssetNft, ASSET_FT_SUBSPACE, ASSET_NFT_SUBSPACE};
pub use auth::Auth;
pub use bank::Bank;
pub use slashing::Slashing;
pub use staking::Staking;
pub use wasm::Wasm;

use crate::runner::Runner;

pub trait Module<'a, R: Runner> {
    fn new(runner: &'a R) -> Self;
}

/// Generate a method that signs and delivers one message.
///
/// ```ignore
/// fn_execute! { pub send: MsgSend => MsgSendResponse }
/// ```
#[macro_export]
macro_rules! fn_execute {
    ($(#[$attr:meta])* $vis:vis $name:ident: $req:ty => $res:ty) => {
        $(#[$attr])*
        $vis fn $name(
            &self,
            msg: $req,
            signer: &$crate::SigningAccount,
        ) -> $crate::RunnerExecuteResult<$res> {
            $crate::Runner::execute::<$req, $res>(
                self.runner,
                msg,
                <$req as $crate::TypeUrl>::TYPE_URL,
                signer,
            )
        }
    };
}

/// Generate a method that queries one route.
///
/// ```ignore
/// fn_query! { pub query_balance ["/cosmos.bank.v1beta1.Query/Balance"]: QueryBalanceRequest => QueryBalanceResponse }
/// ```
#[macro_export]
macro_rules! fn_query {
    ($(#[$attr:meta])* $vis:vis $name:ident [$path:expr]: $req:ty => $res:ty) => {
        $(#[$attr])*
        $vis fn $name(&self, msg: &$req) -> $crate::RunnerResult<$res> {
            $crate::Runner::query::<$req, $res>(self.runner, $path, msg)
        }
    };
}
