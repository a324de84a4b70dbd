use sommelier_core::fingerprint::{DeviceSignals, fingerprint};

pub fn run() {
    let signals = DeviceSignals::collect();
    println!("{}", fingerprint(&signals));
    println!("  renderer: {}", signals.renderer);
    println!("  screen:   {}", signals.screen);
    println!("  timezone: {}", signals.timezone);
    println!("  language: {}", signals.language);
    println!("  platform: {}", signals.platform);
}
