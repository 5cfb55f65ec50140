use std::str::FromStr;

pub(crate) fn is_numeric<T: FromStr>(v: String) -> Result<(), String> {
    v.parse::<T>()
        .map(|_| ())
        .map_err(|_| "must be numeric".to_owned())
}

pub(crate) fn is_positive_u8(v: String) -> Result<(), String> {
    let val = v.parse::<u8>().map_err(|_| "must be numeric".to_owned())?;
    if val > 0 {
        Ok(())
    } else {
        Err("must be > 0".to_owned())
    }
}

pub(crate) fn is_positive_u32(v: String) -> Result<(), String> {
    let val = v.parse::<u32>().map_err(|_| "must be numeric".to_owned())?;
    if val > 0 {
        Ok(())
    } else {
        Err("must be > 0".to_owned())
    }
}
