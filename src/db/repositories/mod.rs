mod data_names;
mod logs;
