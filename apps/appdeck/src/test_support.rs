//! Fake bundles for tests that exercise extraction and launching.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Extracts a desktop entry and `.DirIcon`, and echoes its arguments when run.
pub const EXTRACTING_BUNDLE: &str = r#"#!/bin/sh
if [ "$1" = "--appimage-extract" ]; then
  mkdir -p squashfs-root
  printf '[Desktop Entry]\nType=Application\nName=Demo\nExec=demo %%U\nIcon=demo\n' > squashfs-root/demo.desktop
  printf 'PNG' > squashfs-root/.DirIcon
  exit 0
fi
echo "demo ran with: $*"
exit 0
"#;

/// Fails to extract.
pub const FAILING_BUNDLE: &str = "#!/bin/sh\nexit 3\n";

/// Writes `script` to `path` and makes it executable.
pub fn write_script(path: &Path, script: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, script).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}
