pub mod courant_scan;
