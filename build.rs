fn main() {
    // Node-API link setup is only needed for the cdylib the host loads.
    if std::env::var_os("CARGO_FEATURE_NAPI").is_some() {
        napi_build::setup();
    }
}
