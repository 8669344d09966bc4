//! Parameter access for the asset modules.
//!
//! The asset modules have no message or query surface on this chain, only
//! their parameter subspaces, so these wrappers go through the param-set
//! calls of [`TestApp`] rather than the [`Runner`](crate::Runner) trait.

use chain_tube_types::proto::params::{AssetFtParams, AssetNftParams};

use crate::module::Module;
use crate::runner::app::TestApp;
use crate::runner::result::RunnerResult;

pub const ASSET_FT_SUBSPACE: &str = "assetft";
pub const ASSET_NFT_SUBSPACE: &str = "assetnft";

pub struct AssetFt<'a> {
    app: &'a TestApp,
}

impl<'a> Module<'a, TestApp> for AssetFt<'a> {
    fn new(app: &'a TestApp) -> Self {
        Self { app }
    }
}

impl AssetFt<'_> {
    pub fn params(&self) -> RunnerResult<AssetFtParams> {
        self.app.get_param_set(ASSET_FT_SUBSPACE)
    }

    pub fn set_params(&self, params: &AssetFtParams) -> RunnerResult<()> {
        self.app.set_param_set(ASSET_FT_SUBSPACE, params)
    }
}

pub struct AssetNft<'a> {
    app: &'a TestApp,
}

impl<'a> Module<'a, TestApp> for AssetNft<'a> {
    fn new(app: &'a TestApp) -> Self {
        Self { app }
    }
}

impl AssetNft<'_> {
    pub fn params(&self) -> RunnerResult<AssetNftParams> {
        self.app.get_param_set(ASSET_NFT_SUBSPACE)
    }

    pub fn set_params(&self, params: &AssetNftParams) -> RunnerResult<()> {
        self.app.set_param_set(ASSET_NFT_SUBSPACE, params)
    }
}
