#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Arbitrary TOML must either fail to parse, fail validation, or yield a
    // config whose runtime conversion is usable. Never a panic.
    if let Ok(cfg) = rover_config::load_toml(data)
        && cfg.validate().is_ok()
    {
        let near = cfg.safety.near_threshold_cm;
        assert!(near.is_finite() && near > 0.0);
        assert!(cfg.sampler.period_ms >= 1);
        assert!(cfg.control.full_scale > 0.0);
    }
});
