// ---------------------------------------------------------------------------
// chain-tube-ffi: C ABI over the harness boundary operations.
//
// Every exported symbol forwards to one process-wide `HarnessService`.
//   - String arguments are NUL-terminated UTF-8.
//   - Returned strings are heap C strings; the caller hands them back to
//     `FreeString`.
//   - Fatal errors are logged and the process aborts. Nothing unwinds across
//     this boundary.
// ---------------------------------------------------------------------------

#![allow(non_snake_case)]

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::sync::OnceLock;

use chain_tube_core::{FatalResult, HarnessService, ResultEnvelope};

static SERVICE: OnceLock<HarnessService> = OnceLock::new();

fn service() -> &'static HarnessService {
    SERVICE.get_or_init(HarnessService::from_env)
}

// ---------------------------------------------------------------------------
// Marshalling helpers
// ---------------------------------------------------------------------------

fn fatal(op: &str, err: &dyn std::fmt::Display) -> ! {
    tracing::error!(op, error = %err, "fatal harness error");
    eprintln!("chain-tube: {}: {}", op, err);
    std::process::abort()
}

fn or_abort<T>(op: &str, result: FatalResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => fatal(op, &e),
    }
}

/// Borrow a caller-owned C string.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// for the duration of the call.
unsafe fn arg<'a>(op: &str, name: &str, ptr: *const c_char) -> &'a str {
    if ptr.is_null() {
        fatal(op, &format!("argument `{}` is null", name));
    }
    match CStr::from_ptr(ptr).to_str() {
        Ok(s) => s,
        Err(e) => fatal(op, &format!("argument `{}` is not UTF-8: {}", name, e)),
    }
}

fn out(op: &str, s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(c) => c.into_raw(),
        Err(e) => fatal(op, &e),
    }
}

fn envelope_out(op: &str, result: FatalResult<ResultEnvelope>) -> *mut c_char {
    out(op, or_abort(op, result).to_base64())
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn InitTestEnv() -> u64 {
    or_abort("InitTestEnv", service().create())
}

#[no_mangle]
pub extern "C" fn CleanUp(env_id: u64) {
    or_abort("CleanUp", service().cleanup(env_id))
}

/// Fund a fresh account and return its base64 private key.
///
/// # Safety
/// `coins_json` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn InitAccount(env_id: u64, coins_json: *const c_char) -> *mut c_char {
    let coins_json = arg("InitAccount", "coins_json", coins_json);
    out(
        "InitAccount",
        or_abort("InitAccount", service().fund_account(env_id, coins_json)),
    )
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn IncreaseTime(env_id: u64, seconds: u64) {
    or_abort("IncreaseTime", service().advance_time(env_id, seconds))
}

#[no_mangle]
pub extern "C" fn FinalizeBlock(env_id: u64) {
    or_abort("FinalizeBlock", service().finalize_block(env_id))
}

#[no_mangle]
pub extern "C" fn GetBlockTime(env_id: u64) -> i64 {
    or_abort("GetBlockTime", service().block_time(env_id))
}

#[no_mangle]
pub extern "C" fn GetBlockHeight(env_id: u64) -> i64 {
    or_abort("GetBlockHeight", service().block_height(env_id))
}

// ---------------------------------------------------------------------------
// Transactions and queries
// ---------------------------------------------------------------------------

/// # Safety
/// `base64_tx` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn Execute(env_id: u64, base64_tx: *const c_char) -> *mut c_char {
    let tx = arg("Execute", "base64_tx", base64_tx);
    envelope_out("Execute", service().execute(env_id, tx))
}

/// # Safety
/// `base64_tx` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn Simulate(env_id: u64, base64_tx: *const c_char) -> *mut c_char {
    let tx = arg("Simulate", "base64_tx", base64_tx);
    envelope_out("Simulate", service().simulate(env_id, tx))
}

/// # Safety
/// `path` and `base64_query` must be valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn Query(
    env_id: u64,
    path: *const c_char,
    base64_query: *const c_char,
) -> *mut c_char {
    let path = arg("Query", "path", path);
    let query = arg("Query", "base64_query", base64_query);
    envelope_out("Query", service().query(env_id, path, query))
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// # Safety
/// `address` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn AccountSequence(env_id: u64, address: *const c_char) -> u64 {
    let address = arg("AccountSequence", "address", address);
    or_abort("AccountSequence", service().account_sequence(env_id, address))
}

/// # Safety
/// `address` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn AccountNumber(env_id: u64, address: *const c_char) -> u64 {
    let address = arg("AccountNumber", "address", address);
    or_abort("AccountNumber", service().account_number(env_id, address))
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// # Safety
/// `subspace` and `base64_param_set` must be valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn SetParamSet(
    env_id: u64,
    subspace: *const c_char,
    base64_param_set: *const c_char,
) -> *mut c_char {
    let subspace = arg("SetParamSet", "subspace", subspace);
    let any = arg("SetParamSet", "base64_param_set", base64_param_set);
    envelope_out("SetParamSet", service().set_param_set(env_id, subspace, any))
}

/// # Safety
/// `subspace` and `type_url` must be valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn GetParamSet(
    env_id: u64,
    subspace: *const c_char,
    type_url: *const c_char,
) -> *mut c_char {
    let subspace = arg("GetParamSet", "subspace", subspace);
    let type_url = arg("GetParamSet", "type_url", type_url);
    envelope_out("GetParamSet", service().get_param_set(env_id, subspace, type_url))
}

// ---------------------------------------------------------------------------
// Validators
// ---------------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn GetValidatorAddress(env_id: u64, index: i32) -> *mut c_char {
    out(
        "GetValidatorAddress",
        or_abort("GetValidatorAddress", service().validator_address(env_id, index)),
    )
}

#[no_mangle]
pub extern "C" fn GetValidatorPrivateKey(env_id: u64) -> *mut c_char {
    out(
        "GetValidatorPrivateKey",
        or_abort("GetValidatorPrivateKey", service().validator_private_key(env_id)),
    )
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// Release a string returned by this library. Null is ignored.
///
/// # Safety
/// `ptr` must be null or a pointer previously returned by this library that
/// has not been freed yet.
#[no_mangle]
pub unsafe extern "C" fn FreeString(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_tube_core::ErrorCode;
    use chain_tube_types::encoding::base64_decode;

    unsafe fn take(ptr: *mut c_char) -> String {
        let s = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        FreeString(ptr);
        s
    }

    #[test]
    fn test_lifecycle_through_the_c_abi() {
        let env = InitTestEnv();
        assert!(env >= 1);
        let height = GetBlockHeight(env);
        FinalizeBlock(env);
        assert_eq!(GetBlockHeight(env), height + 1);

        let before = GetBlockTime(env);
        IncreaseTime(env, 10);
        assert_eq!(GetBlockTime(env) - before, 10_000_000_000);

        let coins = CString::new(r#"{"denom":"core","amount":"1000"}"#).unwrap();
        let key = unsafe { take(InitAccount(env, coins.as_ptr())) };
        assert_eq!(base64_decode(&key, "key").unwrap().len(), 32);

        let valoper = unsafe { take(GetValidatorAddress(env, 0)) };
        assert!(valoper.starts_with("corevaloper1"));
        let vkey = unsafe { take(GetValidatorPrivateKey(env)) };
        assert_eq!(base64_decode(&vkey, "key").unwrap().len(), 32);

        CleanUp(env);
        CleanUp(env);
    }

    #[test]
    fn test_query_returns_base64_envelope() {
        let env = InitTestEnv();
        let path = CString::new("/nope.v1.Query/Missing").unwrap();
        let empty = CString::new("").unwrap();
        let envelope = unsafe { take(Query(env, path.as_ptr(), empty.as_ptr())) };
        let err = ResultEnvelope::from_base64(&envelope)
            .unwrap()
            .into_result()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::QueryError);
        assert!(err.message.contains("/nope.v1.Query/Missing"));
        CleanUp(env);
    }

    #[test]
    fn test_free_string_ignores_null() {
        unsafe { FreeString(std::ptr::null_mut()) };
    }
}
