use std::fmt;
use std::path::{Path, PathBuf};

/// Fallback for `XDG_DATA_DIRS` when the variable is unset or empty.
const DEFAULT_DATA_DIRS: &str = "/usr/local/share:/usr/share";

/// Fallback for `XDG_CONFIG_DIRS` when the variable is unset or empty.
const DEFAULT_CONFIG_DIRS: &str = "/etc/xdg";

/// Base directories from the XDG Base Directory specification.
///
/// The `*_home` directory is the user-specific primary location; the
/// `*_dirs` lists are the system-wide fallbacks in precedence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseDirs {
    /// `$XDG_DATA_HOME`, default `~/.local/share`.
    pub data_home: PathBuf,
    /// `$XDG_DATA_DIRS`, default `/usr/local/share:/usr/share`.
    pub data_dirs: Vec<PathBuf>,
    /// `$XDG_CONFIG_HOME`, default `~/.config`.
    pub config_home: PathBuf,
    /// `$XDG_CONFIG_DIRS`, default `/etc/xdg`.
    pub config_dirs: Vec<PathBuf>,
}

impl BaseDirs {
    /// Resolve base directories from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve base directories through an arbitrary variable lookup.
    ///
    /// Empty variables count as unset and empty list components are dropped.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let home = var("HOME").map_or_else(|| PathBuf::from("/"), PathBuf::from);

        let data_home = var("XDG_DATA_HOME")
            .map_or_else(|| home.join(".local").join("share"), PathBuf::from);
        let config_home =
            var("XDG_CONFIG_HOME").map_or_else(|| home.join(".config"), PathBuf::from);
        let data_dirs = split_path_list(&var("XDG_DATA_DIRS").unwrap_or_else(|| DEFAULT_DATA_DIRS.to_string()));
        let config_dirs =
            split_path_list(&var("XDG_CONFIG_DIRS").unwrap_or_else(|| DEFAULT_CONFIG_DIRS.to_string()));

        Self {
            data_home,
            data_dirs,
            config_home,
            config_dirs,
        }
    }

    /// Build base directories rooted in `root` (for tests and sandboxes).
    ///
    /// Layout: `root/home/data`, `root/home/config`, `root/sys/data`,
    /// `root/sys/config`.
    #[must_use]
    pub fn under(root: &Path) -> Self {
        Self {
            data_home: root.join("home").join("data"),
            data_dirs: vec![root.join("sys").join("data")],
            config_home: root.join("home").join("config"),
            config_dirs: vec![root.join("sys").join("config")],
        }
    }

    /// Data directories in precedence order, user location first.
    #[must_use]
    pub fn data_search(&self) -> Vec<PathBuf> {
        std::iter::once(self.data_home.clone())
            .chain(self.data_dirs.iter().cloned())
            .collect()
    }

    /// Config directories in precedence order, user location first.
    #[must_use]
    pub fn config_search(&self) -> Vec<PathBuf> {
        std::iter::once(self.config_home.clone())
            .chain(self.config_dirs.iter().cloned())
            .collect()
    }
}

fn split_path_list(value: &str) -> Vec<PathBuf> {
    value
        .split(':')
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Expand a POSIX locale name into lookup candidates, most specific first.
///
/// `de_DE.UTF-8@euro` yields `de_DE@euro`, `de_DE`, `de@euro`, `de`.
/// The `C` and `POSIX` locales yield nothing.
#[must_use]
pub fn expand_locale(locale: &str) -> Vec<String> {
    if locale.is_empty() || locale == "C" || locale == "POSIX" {
        return Vec::new();
    }

    let (rest, modifier) = locale
        .split_once('@')
        .map_or((locale, None), |(r, m)| (r, Some(m)));
    let without_encoding = rest.split_once('.').map_or(rest, |(r, _)| r);
    let (lang, country) = without_encoding
        .split_once('_')
        .map_or((without_encoding, None), |(l, c)| (l, Some(c)));

    let mut out = Vec::new();
    if let Some(country) = country {
        if let Some(modifier) = modifier {
            out.push(format!("{lang}_{country}@{modifier}"));
        }
        out.push(format!("{lang}_{country}"));
    }
    if let Some(modifier) = modifier {
        out.push(format!("{lang}@{modifier}"));
    }
    out.push(lang.to_string());
    out
}

/// Runtime environment the resolver works against.
///
/// Captures everything the engine would otherwise read from global state:
/// search paths, the current desktop(s), the message locale, the menu file
/// prefix and whether system files are being edited directly.
#[derive(Debug, Clone)]
pub struct Platform {
    /// Base directory search paths.
    pub dirs: BaseDirs,
    /// Current desktop names, from `XDG_CURRENT_DESKTOP`.
    pub desktops: Vec<String>,
    /// Locale lookup candidates, most specific first.
    pub locales: Vec<String>,
    /// `XDG_MENU_PREFIX`, prepended to `applications.menu`.
    pub menu_prefix: String,
    /// Edit system files in place instead of the user's copies.
    pub root_mode: bool,
}

impl Platform {
    /// Detect the current environment.
    #[must_use]
    pub fn detect() -> Self {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        let desktops = var("XDG_CURRENT_DESKTOP")
            .map(|v| {
                v.split(':')
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        let locale = var("LC_ALL")
            .or_else(|| var("LC_MESSAGES"))
            .or_else(|| var("LANG"))
            .unwrap_or_default();

        Self {
            dirs: BaseDirs::from_env(),
            desktops,
            locales: expand_locale(&locale),
            menu_prefix: var("XDG_MENU_PREFIX").unwrap_or_default(),
            root_mode: false,
        }
    }

    /// Create a platform with explicit search paths and desktops.
    #[must_use]
    pub const fn new(dirs: BaseDirs, desktops: Vec<String>) -> Self {
        Self {
            dirs,
            desktops,
            locales: Vec::new(),
            menu_prefix: String::new(),
            root_mode: false,
        }
    }

    /// Replace the current desktop list.
    #[must_use]
    pub fn with_desktops(mut self, desktops: Vec<String>) -> Self {
        self.desktops = desktops;
        self
    }

    /// Toggle root mode.
    #[must_use]
    pub const fn with_root_mode(mut self, root_mode: bool) -> Self {
        self.root_mode = root_mode;
        self
    }

    /// Config directories consulted when locating a menu file by name.
    ///
    /// Root mode skips the user's config home.
    #[must_use]
    pub fn menu_config_dirs(&self) -> Vec<PathBuf> {
        if self.root_mode {
            self.dirs.config_dirs.clone()
        } else {
            self.dirs.config_search()
        }
    }

    /// Data directory that receives edited descriptor records.
    #[must_use]
    pub fn writable_data_dir(&self) -> &Path {
        if self.root_mode {
            self.dirs
                .data_dirs
                .first()
                .map_or(self.dirs.data_home.as_path(), PathBuf::as_path)
        } else {
            &self.dirs.data_home
        }
    }

    /// Whether `path` lives in the user's own data directory.
    #[must_use]
    pub fn is_user_path(&self, path: &Path) -> bool {
        path.starts_with(&self.dirs.data_home)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let desktops = if self.desktops.is_empty() {
            "none".to_string()
        } else {
            self.desktops.join(":")
        };
        write!(f, "desktop={desktops}")?;
        if self.root_mode {
            write!(f, " (root mode)")?;
        }
        Ok(())
    }
}
