use focus_link::ConfigError;

pub const EXECUTION_ERROR: i32 = 1;
pub const CONFIG_ERROR: i32 = 2;

pub fn for_error(error: &anyhow::Error) -> i32 {
    if error.downcast_ref::<ConfigError>().is_some() {
        CONFIG_ERROR
    } else {
        EXECUTION_ERROR
    }
}
