//! Entry point for the cfkit application.
//! Handles CLI parsing, logging and thread-pool setup, and dispatches each subcommand.

use anyhow::{bail, Context, Result};
use cfkit::cli::{Cli, Command, IndexRange};
use cfkit::config::Settings;
use cfkit::discovery::{detect_format, list_dataset_files};
use cfkit::flatten::GroupNode;
use cfkit::logging::init_logging;
use cfkit::mask::WhereValue;
use cfkit::metadata::{
    coordinates_report, dump_field, field_summary, field_to_json, print_field_list,
    print_global_attributes,
};
use cfkit::model::{AttrValue, Domain, Field, FieldList};
use cfkit::netcdf_io::{flatten_file, read, read_group_tree, write};
use cfkit::parallel::get_parallel_info;
use cfkit::plot::{ascii_heatmap, ascii_line_plot, render_heatmap, render_side_by_side, PlotOptions};
use cfkit::query::Query;
use cfkit::statistics::CollapseOptions;
use cfkit::subspace::AxisSelection;
use clap::Parser;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings();
    init_logging(&settings);
    settings.parallel().setup_global_pool()?;

    if settings.verbose {
        println!(
            r#"
------------------------------------------------------------------
                     ____ _____ _    _ _
                    / ___|  ___| | _(_) |_
                   | |   | |_  | |/ / | __|
                   | |___|  _| |   <| | |_
                    \____|_|   |_|\_\_|\__|
                 CF fields on netCDF datasets
------------------------------------------------------------------
"#
        );
        println!("{}", get_parallel_info());
    }

    run(cli.command, &settings)
}

fn open(path: &Path) -> Result<FieldList> {
    read(path).with_context(|| format!("reading {}", path.display()))
}

/// The field named by `identity`, or the only field when none is named.
fn pick_field(fields: &FieldList, identity: Option<&str>) -> Result<Field> {
    match identity {
        Some(id) => Ok(fields.select_field(id)?.clone()),
        None if fields.len() == 1 => Ok(fields.fields[0].clone()),
        None => bail!(
            "the file holds {} fields; choose one with --field (identity, netCDF name or #index)",
            fields.len()
        ),
    }
}

/// Write a single result field with the source's global attributes, or print it.
fn emit(result: Field, source: &FieldList, output: Option<PathBuf>, settings: &Settings) -> Result<()> {
    match output {
        Some(path) => {
            let mut out = FieldList::new(vec![result]);
            out.global_attributes = source.global_attributes.clone();
            write(&out, &path, settings.format)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("✅ Saved result to {}", path.display());
        }
        None => print!("{}", field_summary(&result)),
    }
    Ok(())
}

fn run(command: Command, settings: &Settings) -> Result<()> {
    match command {
        Command::Ls { dir } => {
            for path in list_dataset_files(&dir)? {
                if let Some(name) = path.file_name() {
                    println!("{}", name.to_string_lossy());
                }
            }
        }

        Command::Kind { files } => {
            for file in files {
                let format = detect_format(&file)?;
                println!("{}: {}", file.display(), format);
            }
        }

        Command::List {
            file,
            sort_by,
            select,
            globals,
        } => {
            let mut fields = open(&file)?;
            if let Some(pattern) = select {
                let global_attributes = fields.global_attributes.clone();
                fields = match pattern.strip_prefix('~') {
                    Some(regex) => fields.select_by_regex(regex)?,
                    None => fields.select_by_identity(&pattern),
                };
                fields.global_attributes = global_attributes;
            }
            match sort_by.as_deref() {
                Some("identity") => fields.sort_by_identity(),
                Some(key) => fields.sort_by_property(key),
                None => {}
            }
            print_field_list(&fields);
            if globals {
                print_global_attributes(&fields);
            }
        }

        Command::Dump {
            file,
            field,
            summary,
            json,
            coords,
        } => {
            let fields = open(&file)?;
            let chosen: Vec<Field> = match field.as_deref() {
                Some(id) => vec![pick_field(&fields, Some(id))?],
                None => fields.fields.clone(),
            };
            if json {
                let values: Vec<_> = chosen.iter().map(field_to_json).collect();
                println!("{}", serde_json::to_string_pretty(&values)?);
            } else {
                for f in &chosen {
                    let text = if coords {
                        coordinates_report(f)
                    } else if summary {
                        field_summary(f)
                    } else {
                        dump_field(f)
                    };
                    println!("{}", text);
                }
            }
        }

        Command::Edit {
            file,
            output,
            set_global,
            del_global,
            field,
            set_property,
            del_property,
            del_coordinate_reference,
            del_construct,
        } => {
            let mut fields = open(&file)?;
            for (name, value) in set_global {
                fields.set_global_attribute(&name, value);
            }
            for name in del_global {
                if fields.del_global_attribute(&name).is_none() {
                    tracing::warn!("Global attribute '{}' not present", name);
                }
            }

            let field_edits = !(set_property.is_empty()
                && del_property.is_empty()
                && del_coordinate_reference.is_empty()
                && del_construct.is_empty());
            if field_edits {
                let index = match field.as_deref() {
                    Some(id) => fields.select_index(id)?,
                    None if fields.len() == 1 => 0,
                    None => bail!("property edits need --field when the file holds several fields"),
                };
                let target = &mut fields.fields[index];
                for (name, value) in set_property {
                    target.set_property(&name, value);
                }
                for name in del_property {
                    if target.del_property(&name).is_none() {
                        tracing::warn!("Property '{}' not present on {}", name, target.identity());
                    }
                }
                for id in del_coordinate_reference {
                    let removed = target.del_coordinate_reference(&id)?;
                    println!("Removed coordinate reference {}", removed.identity());
                }
                for id in del_construct {
                    let removed = target.del_construct(&id)?;
                    println!("Removed construct ncvar%{}", removed);
                }
            }

            write(&fields, &output, settings.format)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("✅ Saved result to {}", output.display());
        }

        Command::Collapse {
            file,
            field,
            axes,
            method,
            weighted,
            ddof,
            output,
        } => {
            let fields = open(&file)?;
            let source = pick_field(&fields, field.as_deref())?;
            let axes: Vec<&str> = axes.iter().map(String::as_str).collect();
            let result = source.collapse(&axes, method, CollapseOptions { weighted, ddof })?;
            emit(result, &fields, output, settings)?;
        }

        Command::Mask {
            file,
            field,
            condition,
            coordinate,
            value,
            output,
        } => {
            let fields = open(&file)?;
            let source = pick_field(&fields, field.as_deref())?;
            let query = Query::parse(&condition)?;
            let value = value.map(WhereValue::Value).unwrap_or(WhereValue::Masked);
            let result = match coordinate {
                Some(coord) => source.where_coordinate(&coord, &query, value)?,
                None => source.where_data(&query, value),
            };
            println!(
                "Masked {} of {} values",
                result.count_masked(),
                result.size()
            );
            emit(result, &fields, output, settings)?;
        }

        Command::Subspace {
            file,
            field,
            select,
            index,
            output,
        } => {
            let fields = open(&file)?;
            let mut result = pick_field(&fields, field.as_deref())?;
            let selections = select
                .iter()
                .map(|s| AxisSelection::parse(s))
                .collect::<cfkit::Result<Vec<_>>>()?;
            if !selections.is_empty() {
                result = result.subspace(&selections)?;
            }
            for IndexRange { axis, start, end } in index {
                result = result.subspace_range(&axis, start, end)?;
            }
            emit(result, &fields, output, settings)?;
        }

        Command::Regrid {
            file,
            field,
            target,
            target_field,
            grid,
            method,
            cartesian,
            output,
            compare,
        } => {
            let fields = open(&file)?;
            let source = pick_field(&fields, field.as_deref())?;
            let destination: Domain = match (target, grid) {
                (Some(path), _) => {
                    let target_fields = open(&path)?;
                    pick_field(&target_fields, target_field.as_deref())?.domain
                }
                (None, Some((nlat, nlon))) => Domain::global_grid(nlat, nlon),
                (None, None) => bail!("give a destination with --target or --grid"),
            };
            let spherical = if cartesian { Some(false) } else { None };
            let result = source.regrid(&destination, method, spherical)?;
            if let Some(path) = compare {
                render_side_by_side(&source, &result, &PlotOptions::default())?.save(&path)?;
                println!("✅ Saved comparison to {}", path.display());
            }
            emit(result, &fields, output, settings)?;
        }

        Command::Groups { file } => {
            let tree: GroupNode = read_group_tree(&file)?;
            print!("{}", tree.tree_summary());
        }

        Command::Flatten { input, output } => {
            let flat = flatten_file(&input, &output, settings.format)?;
            println!(
                "✅ Flattened {} variables into {}",
                flat.variables.len(),
                output.display()
            );
            if let Some(AttrValue::Strs(mapping)) = flat.attributes.get("__flattener_name_mapping_variables") {
                for entry in mapping {
                    println!("    {}", entry);
                }
            }
        }

        Command::Plot {
            file,
            field,
            output,
            palette,
            scale,
            width,
        } => {
            let fields = open(&file)?;
            let source = pick_field(&fields, field.as_deref())?;
            match output {
                Some(path) => {
                    let options = PlotOptions {
                        palette,
                        scale,
                        range: None,
                    };
                    render_heatmap(&source, &options)?.save(&path)?;
                    println!("✅ Saved plot to {}", path.display());
                }
                None => {
                    let text = match source.squeeze().rank() {
                        1 => ascii_line_plot(&source, width, 16)?,
                        _ => ascii_heatmap(&source, width)?,
                    };
                    print!("{}", text);
                }
            }
        }
    }
    Ok(())
}
