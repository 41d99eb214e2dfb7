use std::path::PathBuf;

pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const DEFAULT_FIXTURE_PATH: &str = "data/parcels.geojson";
pub const DEFAULT_STATIC_DIR: &str = "client/dist";
pub const API_PREFIX: &str = "/api/v1";

pub fn server_port() -> u16 {
    std::env::var("LANDVIEW_PORT")
        .ok()
        .and_then(|value| value.trim().parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SERVER_PORT)
}

pub fn fixture_path() -> PathBuf {
    non_empty_env("PARCEL_FIXTURE_PATH")
        .unwrap_or_else(|| DEFAULT_FIXTURE_PATH.to_string())
        .into()
}

pub fn static_dir() -> PathBuf {
    non_empty_env("LANDVIEW_STATIC_DIR")
        .unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string())
        .into()
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_falls_back_on_missing_or_invalid_values() {
        temp_env::with_var_unset("LANDVIEW_PORT", || {
            assert_eq!(server_port(), DEFAULT_SERVER_PORT);
        });
        temp_env::with_var("LANDVIEW_PORT", Some("not-a-port"), || {
            assert_eq!(server_port(), DEFAULT_SERVER_PORT);
        });
        temp_env::with_var("LANDVIEW_PORT", Some("0"), || {
            assert_eq!(server_port(), DEFAULT_SERVER_PORT);
        });
        temp_env::with_var("LANDVIEW_PORT", Some(" 8088 "), || {
            assert_eq!(server_port(), 8088);
        });
    }

    #[test]
    fn paths_ignore_blank_overrides() {
        temp_env::with_vars(
            [
                ("PARCEL_FIXTURE_PATH", Some("   ")),
                ("LANDVIEW_STATIC_DIR", Some("/srv/landview")),
            ],
            || {
                assert_eq!(fixture_path(), PathBuf::from(DEFAULT_FIXTURE_PATH));
                assert_eq!(static_dir(), PathBuf::from("/srv/landview"));
            },
        );
    }
}
