mod conversions;
mod traits;

pub use conversions::{
    get_binary, get_bool, get_number, get_optional_number, get_optional_string, get_string,
    put_optional,
};
pub use traits::Entity;
