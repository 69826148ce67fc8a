use std::collections::HashMap;
use std::sync::LazyLock;

use udx_error::{Result, UdxError};

use crate::arrays::scalar::ScalarValue;

pub const DEFAULT_INPUT_BUFFER_SIZE: usize = 64 * 1024;
pub const DEFAULT_OUTPUT_BUFFER_SIZE: usize = 64 * 1024;
pub const DEFAULT_BATCH_SIZE: usize = 1024;
pub const DEFAULT_RESERVE_READ_SIZE: usize = 4 * 1024;

/// Configuration for a load (source -> filter -> parser).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadConfig {
    /// Size of the buffers handed from the source to the next stage.
    pub input_buffer_size: usize,
    /// Size of the output buffers handed to filters.
    pub output_buffer_size: usize,
    /// Maximum rows a parser may emit before it has to yield.
    pub batch_size: usize,
    /// Bytes pulled from the underlying reader per reservation refill.
    pub reserve_read_size: usize,
    /// Halve the bytes the substitution filter advances per call.
    pub substitution_throttle: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        LoadConfig {
            input_buffer_size: DEFAULT_INPUT_BUFFER_SIZE,
            output_buffer_size: DEFAULT_OUTPUT_BUFFER_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            reserve_read_size: DEFAULT_RESERVE_READ_SIZE,
            substitution_throttle: false,
        }
    }
}

impl LoadConfig {
    pub fn set_from_scalar(&mut self, name: &str, value: &ScalarValue) -> Result<()> {
        let func = lookup(name)?;
        (func.set)(value, self)
    }

    pub fn get_as_scalar(&self, name: &str) -> Result<ScalarValue> {
        let func = lookup(name)?;
        Ok((func.get)(self))
    }

    /// Parse `name=value` and apply it.
    ///
    /// Values that look like integers are passed as integers, everything
    /// else as strings.
    pub fn set_from_str(&mut self, assignment: &str) -> Result<()> {
        let (name, value) = assignment.split_once('=').ok_or_else(|| {
            UdxError::config(format!("Expected 'name=value', got '{assignment}'"))
        })?;
        let value = value.trim();
        let scalar = match value.parse::<i64>() {
            Ok(v) => ScalarValue::Int64(v),
            Err(_) => ScalarValue::from(value),
        };
        self.set_from_scalar(name.trim(), &scalar)
    }

    pub fn reset(&mut self, name: &str) -> Result<()> {
        let def_conf = Self::default();
        let func = lookup(name)?;
        let scalar = (func.get)(&def_conf);
        (func.set)(&scalar, self)
    }
}

/// Name, description, and current value of every setting, sorted by name.
pub fn settings(conf: &LoadConfig) -> Vec<(&'static str, &'static str, ScalarValue)> {
    let mut out: Vec<_> = GET_SET_FUNCTIONS
        .iter()
        .map(|(name, func)| (*name, func.description, (func.get)(conf)))
        .collect();
    out.sort_by_key(|(name, _, _)| *name);
    out
}

fn lookup(name: &str) -> Result<&'static SettingFunctions> {
    GET_SET_FUNCTIONS
        .get(name)
        .ok_or_else(|| UdxError::config(format!("Missing setting for '{name}'")))
}

struct SettingFunctions {
    description: &'static str,
    set: fn(scalar: &ScalarValue, conf: &mut LoadConfig) -> Result<()>,
    get: fn(conf: &LoadConfig) -> ScalarValue,
}

impl SettingFunctions {
    const fn new<S: LoadSetting>() -> Self {
        SettingFunctions {
            description: S::DESCRIPTION,
            set: S::set_from_scalar as _,
            get: S::get_as_scalar as _,
        }
    }
}

fn insert_setting<S: LoadSetting>(map: &mut HashMap<&'static str, SettingFunctions>) {
    if map.insert(S::NAME, SettingFunctions::new::<S>()).is_some() {
        panic!("Duplicate settings names: {}", S::NAME);
    }
}

static GET_SET_FUNCTIONS: LazyLock<HashMap<&'static str, SettingFunctions>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    insert_setting::<InputBufferSize>(&mut map);
    insert_setting::<OutputBufferSize>(&mut map);
    insert_setting::<BatchSize>(&mut map);
    insert_setting::<ReserveReadSize>(&mut map);
    insert_setting::<SubstitutionThrottle>(&mut map);

    map
});

pub trait LoadSetting: Sync + Send + 'static {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn set_from_scalar(scalar: &ScalarValue, conf: &mut LoadConfig) -> Result<()>;
    fn get_as_scalar(conf: &LoadConfig) -> ScalarValue;
}

/// Sizes must be positive and fit in usize.
fn positive_size(name: &str, scalar: &ScalarValue) -> Result<usize> {
    let val = scalar
        .try_as_i64()
        .map_err(|_| UdxError::config(format!("Setting '{name}' expects an integer")))?;
    if val <= 0 {
        return Err(UdxError::config(format!("Setting '{name}' must be greater than zero"))
            .with_field("value", val));
    }
    usize::try_from(val)
        .map_err(|_| UdxError::config(format!("Setting '{name}' is too large")).with_field("value", val))
}

pub struct InputBufferSize;

impl LoadSetting for InputBufferSize {
    const NAME: &'static str = "input_buffer_size";
    const DESCRIPTION: &'static str = "Bytes per buffer handed from a source to the next stage";

    fn set_from_scalar(scalar: &ScalarValue, conf: &mut LoadConfig) -> Result<()> {
        conf.input_buffer_size = positive_size(Self::NAME, scalar)?;
        Ok(())
    }

    fn get_as_scalar(conf: &LoadConfig) -> ScalarValue {
        ScalarValue::Int64(conf.input_buffer_size as i64)
    }
}

pub struct OutputBufferSize;

impl LoadSetting for OutputBufferSize {
    const NAME: &'static str = "output_buffer_size";
    const DESCRIPTION: &'static str = "Bytes of output space handed to filters per call";

    fn set_from_scalar(scalar: &ScalarValue, conf: &mut LoadConfig) -> Result<()> {
        conf.output_buffer_size = positive_size(Self::NAME, scalar)?;
        Ok(())
    }

    fn get_as_scalar(conf: &LoadConfig) -> ScalarValue {
        ScalarValue::Int64(conf.output_buffer_size as i64)
    }
}

pub struct BatchSize;

impl LoadSetting for BatchSize {
    const NAME: &'static str = "batch_size";
    const DESCRIPTION: &'static str = "Rows a parser may emit before yielding";

    fn set_from_scalar(scalar: &ScalarValue, conf: &mut LoadConfig) -> Result<()> {
        conf.batch_size = positive_size(Self::NAME, scalar)?;
        Ok(())
    }

    fn get_as_scalar(conf: &LoadConfig) -> ScalarValue {
        ScalarValue::Int64(conf.batch_size as i64)
    }
}

pub struct ReserveReadSize;

impl LoadSetting for ReserveReadSize {
    const NAME: &'static str = "reserve_read_size";
    const DESCRIPTION: &'static str = "Bytes read per refill in reservation mode";

    fn set_from_scalar(scalar: &ScalarValue, conf: &mut LoadConfig) -> Result<()> {
        conf.reserve_read_size = positive_size(Self::NAME, scalar)?;
        Ok(())
    }

    fn get_as_scalar(conf: &LoadConfig) -> ScalarValue {
        ScalarValue::Int64(conf.reserve_read_size as i64)
    }
}

pub struct SubstitutionThrottle;

impl LoadSetting for SubstitutionThrottle {
    const NAME: &'static str = "substitution_throttle";
    const DESCRIPTION: &'static str =
        "Advance at most half the available output space per substitution filter call";

    fn set_from_scalar(scalar: &ScalarValue, conf: &mut LoadConfig) -> Result<()> {
        conf.substitution_throttle = scalar.try_as_bool().map_err(|e| {
            UdxError::config(format!("Setting '{}' expects a boolean", Self::NAME)).with_source(e)
        })?;
        Ok(())
    }

    fn get_as_scalar(conf: &LoadConfig) -> ScalarValue {
        conf.substitution_throttle.into()
    }
}
