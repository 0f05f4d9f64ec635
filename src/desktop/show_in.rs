/// Whether any desktop in `listed` is one of the `current` desktops.
///
/// # Examples
///
/// ```
/// use xdgmenu_cli::desktop::show_in::overlaps;
///
/// let listed = vec!["GNOME".to_string(), "XFCE".to_string()];
/// assert!(overlaps(&listed, &["XFCE".to_string()]));
/// assert!(!overlaps(&listed, &["KDE".to_string()]));
/// ```
#[must_use]
pub fn overlaps(listed: &[String], current: &[String]) -> bool {
    listed.iter().any(|d| current.contains(d))
}

/// Decide whether an entry is shown under the current desktops.
///
/// With no current desktop everything is shown. Otherwise a non-empty
/// `only_show_in` must name one of the current desktops, and
/// `not_show_in` must name none of them.
///
/// # Examples
///
/// ```
/// use xdgmenu_cli::desktop::show_in::shown_in;
///
/// let kde = vec!["KDE".to_string()];
/// assert!(!shown_in(&["GNOME".to_string()], &[], &kde));
/// assert!(!shown_in(&[], &["KDE".to_string()], &kde));
/// assert!(shown_in(&["GNOME".to_string()], &[], &[]));
/// ```
#[must_use]
pub fn shown_in(only_show_in: &[String], not_show_in: &[String], current: &[String]) -> bool {
    if current.is_empty() {
        return true;
    }
    if !only_show_in.is_empty() && !overlaps(only_show_in, current) {
        return false;
    }
    !overlaps(not_show_in, current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn overlap_needs_one_shared_desktop() {
        assert!(overlaps(&list(&["GNOME", "KDE"]), &list(&["KDE"])));
        assert!(!overlaps(&list(&["GNOME"]), &list(&["KDE"])));
        assert!(!overlaps(&[], &list(&["KDE"])));
    }

    #[test]
    fn only_show_in_restricts() {
        let current = list(&["XFCE"]);
        assert!(shown_in(&list(&["XFCE", "LXDE"]), &[], &current));
        assert!(!shown_in(&list(&["LXDE"]), &[], &current));
    }

    #[test]
    fn not_show_in_excludes() {
        let current = list(&["GNOME", "Unity"]);
        assert!(!shown_in(&[], &list(&["Unity"]), &current));
        assert!(shown_in(&[], &list(&["KDE"]), &current));
    }

    #[test]
    fn no_current_desktop_shows_everything() {
        assert!(shown_in(&list(&["LXDE"]), &list(&["LXDE"]), &[]));
    }
}
