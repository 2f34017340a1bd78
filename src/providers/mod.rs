pub mod domeneshop;
