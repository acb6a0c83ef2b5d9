use std::{fs, path::Path};

use memmap2::Mmap;

use super::Backend;
use crate::{Error::FileError, Result};

/// Read-only memory map of a game binary or metadata file on disk.
#[derive(Debug)]
pub struct Physical {
    map: Mmap,
}

impl Physical {
    /// Map the file at `path`
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or mapped.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = fs::File::open(path).map_err(FileError)?;
        let map = unsafe { Mmap::map(&file) }.map_err(FileError)?;
        Ok(Physical { map })
    }
}

impl Backend for Physical {
    fn data(&self) -> &[u8] {
        &self.map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::{GlobalMetadata, MetadataVersion},
        test::MetadataBuilder,
    };

    #[test]
    fn test_metadata_from_mapped_file() {
        let mut builder = MetadataBuilder::new(MetadataVersion::new(27.1));
        builder.corlib();
        builder.assembly("Game", "Game.dll");
        let blob = builder.encode();

        let path = std::env::temp_dir().join(format!("il2scope-metadata-{}.dat", std::process::id()));
        fs::write(&path, &blob).unwrap();

        let mapped = Physical::new(&path).unwrap();
        assert_eq!(mapped.len(), blob.len());
        assert_eq!(mapped.data_slice(0, 8).unwrap(), &blob[..8]);
        assert!(mapped.data_slice(blob.len() - 2, 4).is_err());
        drop(mapped);

        let metadata = GlobalMetadata::from_file(&path, None).unwrap();
        assert_eq!(metadata.assemblies.len(), 2);
        assert_eq!(metadata.assemblies[1].aname.name(&metadata).unwrap(), "Game");

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_physical_missing() {
        assert!(matches!(
            Physical::new("/definitely/not/here/global-metadata.dat"),
            Err(FileError(_))
        ));
    }
}
