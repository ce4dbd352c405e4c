//! Per-plugin documents rendered from validated metadata.

use super::schema::PluginMetadata;

/// Render the plugin's README.md.
pub fn render_readme(plugin: &PluginMetadata) -> String {
    let mut install = String::from("\n\n## Installation Instructions");
    for (platform, text) in &plugin.installinstructions {
        install.push_str(&format!("\n\n### {platform}\n\n{text}"));
    }

    let mut dependencies = String::new();
    if let Some(declared) = &plugin.dependencies {
        dependencies.push_str(
            "\n\n## Required Dependencies\n\nThe following dependencies are required for this plugin:\n\n",
        );
        for (installer, packages) in declared {
            dependencies.push_str(&format!(" * {installer} - {}\n", packages.join(", ")));
        }
        dependencies.push('\n');
    }

    format!(
        "# {name} (v{version})\n\
         Author: **{author}**\n\
         \n\
         _{description}_\n\
         \n\
         ## Description:\n\
         \n\
         {longdescription}\n\
         {install}\n\
         \n\
         ## Minimum Version\n\
         \n\
         This plugin requires the following minimum version of Binary Ninja:\n\
         \n\
         * {minimum}\n\
         \n\
         {dependencies}\n\
         ## License\n\
         \n\
         This plugin is released under a {license} license.\n\
         ## Metadata Version\n\
         \n\
         {metadata_version}\n",
        name = plugin.name,
        version = plugin.version,
        author = plugin.author,
        description = plugin.description,
        longdescription = plugin.longdescription,
        minimum = plugin.minimumbinaryninjaversion,
        license = plugin.license.name,
        metadata_version = plugin.pluginmetadataversion,
    )
}

/// Contents of the plugin's LICENSE file.
pub fn render_license(plugin: &PluginMetadata) -> String {
    plugin.license.text.clone()
}
