// Domain layer: conversion models and ports (interfaces).

pub mod model;
pub mod ports;
