use crate::error::SimError;
use crate::traits::Component;
use serde_json::Value;

pub mod txc;

macro_rules! register_components {
    ($($kind:literal => $type:ty),* $(,)?) => {
        /// Build a component from its kind name and an optional JSON config.
        /// `Value::Null` means defaults.
        pub fn create_component(kind: &str, name: &str, data: Value) -> Result<Box<dyn Component>, SimError> {
            match kind {
                $(
                    $kind => {
                        let config = if data.is_null() {
                            Default::default()
                        } else {
                            serde_json::from_value(data).map_err(|e| SimError::InvalidConfig {
                                kind: kind.to_string(),
                                reason: e.to_string(),
                            })?
                        };
                        Ok(Box::new(<$type>::with_config(name, config)))
                    }
                )*
                _ => Err(SimError::UnknownComponentKind(kind.to_string())),
            }
        }

        pub fn component_kinds() -> Vec<&'static str> {
            vec![$($kind),*]
        }
    };
}

register_components!(
    "Txc" => txc::Txc,
);
