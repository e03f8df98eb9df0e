//! Convenience macros for plugin development.

/// Builds a [`PluginInfo`](crate::traits::PluginInfo).
///
/// `name` and `version` are required; the other fields are optional but
/// must appear in this order.
///
/// # Example
/// ```rust,ignore
/// let info = plugin_info!(
///     name: "audit",
///     version: "1.0.0",
///     description: "Records every login",
///     author: "Ops",
///     dependencies: ["storage"]
/// );
/// ```
#[macro_export]
macro_rules! plugin_info {
    (
        name: $name:expr,
        version: $version:expr
        $(, description: $desc:expr)?
        $(, author: $author:expr)?
        $(, dependencies: [$($dep:expr),* $(,)?])?
        $(,)?
    ) => {{
        #[allow(unused_mut)]
        let mut info = $crate::traits::PluginInfo::new($name, $version);
        $( info.description = $desc.to_string(); )?
        $( info.author = $author.to_string(); )?
        $( $( info.dependencies.push($dep.to_string()); )* )?
        info
    }};
}
