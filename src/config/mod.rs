mod settings;

pub use settings::{
    Settings, SettingsLoader, SettingsWriter, API_KEY_ENV, DEFAULT_CONFIG_PATH, GATE_PASSWORD_ENV,
};
