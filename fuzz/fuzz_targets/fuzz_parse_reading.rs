#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Whole GraphQL bodies first, then single reading records
    let _ = oejp_meter::kraken::client::interpret_response(200, text);
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
        let _ = oejp_meter::kraken::HHReading::from_raw(&value);
    }
    let _ = oejp_meter::time::parse_api_datetime(text);
});
