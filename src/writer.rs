use std::{
    fs, io,
    path::{Path, PathBuf},
};

use netcdf::NcTypeDescriptor;
use tracing::debug;

use crate::{
    dataset::OzoneDataset,
    error::{ConvertError, Result},
    VAR_OZONE, VAR_QC, VAR_TIME,
};

// ─────────────────────────────────────────────────────────────────────
// Staging: the container is built next to the target and only renamed
// into place once it has been closed. Dropping without `commit` deletes it.
// ─────────────────────────────────────────────────────────────────────
struct Staged<'a> {
    tmp:  PathBuf,
    dest: &'a Path,
    done: bool,
}

impl<'a> Staged<'a> {
    fn new(dest: &'a Path) -> Result<Self> {
        let mut name = dest
            .file_name()
            .ok_or_else(|| {
                ConvertError::io(dest, io::Error::new(io::ErrorKind::InvalidInput, "output path has no file name"))
            })?
            .to_os_string();
        name.push(".partial");
        Ok(Staged { tmp: dest.with_file_name(name), dest, done: false })
    }

    fn commit(mut self) -> Result<()> {
        fs::rename(&self.tmp, self.dest).map_err(|e| ConvertError::io(self.dest, e))?;
        self.done = true;
        Ok(())
    }
}

impl Drop for Staged<'_> {
    fn drop(&mut self) {
        if !self.done {
            let _ = fs::remove_file(&self.tmp);
        }
    }
}

fn nc_err(path: &Path, stage: &'static str) -> impl FnOnce(netcdf::error::Error) -> ConvertError + '_ {
    move |source| ConvertError::NetCdf { path: path.to_path_buf(), stage, source }
}

// Bulk write of one column into an already defined variable (data mode).
fn put_column<T: NcTypeDescriptor>(
    nc:     &mut netcdf::FileMut,
    name:   &'static str,
    values: &[T],
    out:    &Path,
    stage:  &'static str,
) -> Result<()> {
    let mut v = nc
        .variable_mut(name)
        .ok_or_else(|| nc_err(out, stage)(netcdf::error::Error::NotFound(name.to_string())))?;
    v.put_values(values, ..values.len()).map_err(nc_err(out, stage))
}

// ─────────────────────────────────────────────────────────────────────
// Dataset → NetCDF
// ─────────────────────────────────────────────────────────────────────

/// Write `ds` to `out` as a NETCDF4 classic-model file, replacing whatever is
/// there. Nothing appears at `out` unless every step succeeded.
///
/// Classic model keeps netCDF-3 define/data mode rules: everything is defined
/// first, then `enddef`, then the columns are written.
pub fn write_netcdf(ds: &OzoneDataset, out: &Path) -> Result<()> {
    let staged = Staged::new(out)?;
    let tmp = staged.tmp.as_path();

    let mut nc = netcdf::create_with(tmp, netcdf::Options::NETCDF4 | netcdf::Options::CLASSIC)
        .map_err(nc_err(out, "creating file"))?;

    // ---------------- define mode ----------------
    for (name, value) in &ds.global_attributes {
        nc.add_attribute(name, value.as_str())
            .map_err(nc_err(out, "writing global attributes"))?;
    }

    nc.add_unlimited_dimension(VAR_TIME)
        .map_err(nc_err(out, "defining the time dimension"))?;

    {
        let mut v = nc.add_variable::<f64>(VAR_TIME, &[VAR_TIME])
            .map_err(nc_err(out, "defining time"))?;
        v.put_attribute("units", ds.time_units.as_str())
            .map_err(nc_err(out, "writing time attributes"))?;
    }
    {
        let mut v = nc.add_variable::<f32>(VAR_OZONE, &[VAR_TIME])
            .map_err(nc_err(out, "defining ozone_concentration"))?;
        v.put_attribute("long_name", "ozone concentration")
            .map_err(nc_err(out, "writing ozone_concentration attributes"))?;
        v.put_attribute("units", "parts per billion")
            .map_err(nc_err(out, "writing ozone_concentration attributes"))?;
    }
    {
        let mut v = nc.add_variable::<i32>(VAR_QC, &[VAR_TIME])
            .map_err(nc_err(out, "defining qc_flag"))?;
        v.put_attribute("long_name", "quality control flag")
            .map_err(nc_err(out, "writing qc_flag attributes"))?;
        v.put_attribute("flag_values", ds.codebook.flag_values().to_vec())
            .map_err(nc_err(out, "writing qc_flag attributes"))?;
        v.put_attribute("flag_meanings", ds.codebook.flag_meanings())
            .map_err(nc_err(out, "writing qc_flag attributes"))?;
    }

    nc.enddef().map_err(nc_err(out, "leaving define mode"))?;

    // ---------------- data mode ----------------
    put_column(&mut nc, VAR_TIME, &ds.time, out, "writing time values")?;
    put_column(&mut nc, VAR_OZONE, &ds.ozone, out, "writing ozone_concentration values")?;
    put_column(&mut nc, VAR_QC, &ds.qc_flag, out, "writing qc_flag values")?;

    debug!(rows = ds.len(), staging = %tmp.display(), "container populated, closing");
    nc.close().map_err(nc_err(out, "closing file"))?;

    staged.commit()
}
